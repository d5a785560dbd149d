#[derive(Debug)]
pub enum ApplicationError {
    NotFound,
    InternalError(String),
    BadRequest(String),
    Unauthorized,
    Conflict(String),
    Configuration(String),
    Upstream { status: u16, body: String },
}
