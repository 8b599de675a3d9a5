/// Turn the `-1` error return of a libc call into the current `errno`.
pub fn cerr<Int: Copy + TryInto<libc::c_long>>(res: Int) -> std::io::Result<Int> {
    match res.try_into() {
        Ok(-1) => Err(std::io::Error::last_os_error()),
        _ => Ok(res),
    }
}

/// Whether `fildes` is a terminal. Only character devices are asked, so no terminal ioctl is
/// ever issued on a pipe or a regular file.
pub fn safe_isatty(fildes: libc::c_int) -> bool {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fildes, stat.as_mut_ptr()) } != 0 {
        return false;
    }
    // SAFETY: `fstat` succeeded.
    let mode = unsafe { stat.assume_init() }.st_mode;

    (mode & libc::S_IFMT) == libc::S_IFCHR && unsafe { libc::isatty(fildes) } != 0
}

/// Whether an I/O error only means that a blocking call was interrupted by a signal.
pub fn was_interrupted(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::Interrupted
}
