pub mod normalize;
pub mod parser;
pub mod record;
pub mod thumbprint;
pub mod validate;

pub use normalize::{der_thumbprint, detect_encoding, normalize};
pub use parser::{CertificateMetadata, CertificateParser};
pub use record::{CertificateRecord, Encoding, RecordStatus};
pub use thumbprint::Thumbprint;
pub use validate::Validator;
