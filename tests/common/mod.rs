use hyper::{body, Body, Client, HeaderMap, Request, StatusCode};

pub type TestError = Box<dyn std::error::Error + Send + Sync>;

pub async fn send_request(
    request: Request<Body>,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), TestError> {
    let response = Client::new().request(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = body::to_bytes(response.into_body()).await?;

    Ok((status, headers, bytes.to_vec()))
}
