use std::io;

pub trait ReadFrom<R: io::Read>: Sized {
    type Error;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error>;
}

/// Read the remainder of a value whose envelope has already been consumed.
/// `Header` carries whatever the envelope told us about the body.
pub trait ReadRemainingFrom<Header, R: io::Read>: Sized {
    type Error;
    fn read_remaining_from(header: Header, reader: &mut R) -> Result<Self, Self::Error>;
}
