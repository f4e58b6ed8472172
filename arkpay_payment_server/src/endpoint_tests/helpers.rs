use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;

/// Sends a POST with a JSON payload to a freshly built app and returns the response status and
/// body. Errors raised before a handler runs (e.g. by the signature middleware) are rendered
/// through their `ResponseError` impl so the caller can still assert on the wire format.
pub async fn post_request<F>(
    path: &str,
    body: String,
    headers: &[(&str, String)],
    configure: F,
) -> (StatusCode, String)
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((*name, value.as_str()));
    }
    let req = req.to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making POST request to {path}");
    let res = match test::try_call_service(&service, req).await {
        Ok(res) => res.map_into_boxed_body(),
        Err(e) => {
            let req = TestRequest::post().uri(path).to_http_request();
            ServiceResponse::new(req, e.error_response())
        },
    };
    let (_, res) = res.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making GET request to {path}");
    let (_, res) = test::call_service(&service, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
