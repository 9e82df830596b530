use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::os::raw::c_int;

#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Errno(pub c_int);

impl Display for Errno {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&io::Error::from_raw_os_error(self.0), f)
    }
}

impl Debug for Errno {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Errno({}: {})", self.0, self)
    }
}

impl Error for Errno {}

impl From<io::Error> for Errno {
    fn from(err: io::Error) -> Self {
        if let Some(errno) = err.raw_os_error() {
            return Errno(errno);
        }

        Errno(libc::EINVAL)
    }
}

impl From<Errno> for c_int {
    fn from(errno: Errno) -> Self {
        errno.0
    }
}

impl From<c_int> for Errno {
    fn from(errno: c_int) -> Self {
        Self(errno)
    }
}
