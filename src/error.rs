use std::fmt;

#[derive(Debug)]
pub enum InksetError {
    MalformedStylesheet(String),
    MalformedDeclaration(String),
    ResourceNotFound(String),
    Io(std::io::Error),
}

impl fmt::Display for InksetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InksetError::MalformedStylesheet(block) => {
                write!(f, "malformed stylesheet: rule block without '{{': {}", block)
            }
            InksetError::MalformedDeclaration(declaration) => {
                write!(f, "malformed declaration without ':': {}", declaration)
            }
            InksetError::ResourceNotFound(source) => {
                write!(f, "source document could not be read: {}", source)
            }
            InksetError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for InksetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InksetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InksetError {
    fn from(value: std::io::Error) -> Self {
        InksetError::Io(value)
    }
}
