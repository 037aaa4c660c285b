/// Errors produced while talking to the generation API.
///
/// These never reach the views: the generation client logs them and falls
/// back to empty or placeholder results.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The API returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body was not the JSON we expected.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The response parsed but carried no candidate text.
    #[error("API response contained no text")]
    EmptyResponse,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}
