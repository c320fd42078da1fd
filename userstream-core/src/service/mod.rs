pub mod payload_encryption;

pub use payload_encryption::PayloadCipher;
