use rustix::{
    fd::AsFd,
    io::{self, Errno, Result},
};

pub fn write_all<Fd: AsFd>(fd: Fd, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match io::write(fd.as_fd(), buf) {
            Ok(n) => buf = &buf[n..],
            Err(Errno::INTR) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reads until end of file or until `limit` bytes have been collected.
pub fn read_up_to<Fd: AsFd>(fd: Fd, limit: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0; limit];
    let mut filled = 0;

    while filled < limit {
        match io::read(fd.as_fd(), &mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(Errno::INTR) => {}
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}
