//! Row-to-contact pipeline: parse a tabular upload, normalize each row through
//! the batch's field mapping, then encode the vCard and the QR image.

pub mod generate;
pub mod normalize;
pub mod parse;
pub mod qr;
pub mod vcard;
