//! Builtin nodes linked into compiled programs.

use std::{
    ffi::{c_char, CStr},
    io::{self, Write},
};

/// The `print` builtin: writes the NUL terminated string and a line break to
/// the standard output. A null pointer prints an empty line.
///
/// # Safety
///
/// `s` must be null or point to a NUL terminated string which stays valid
/// for the whole call.
#[no_mangle]
pub unsafe extern "C" fn print(s: *const c_char) {
    let bytes = if s.is_null() {
        &[][..]
    } else {
        // SAFETY: Guaranteed by the caller.
        unsafe { CStr::from_ptr(s) }.to_bytes()
    };
    // There is nobody to report a failed write to.
    _ = write_line(&mut io::stdout().lock(), bytes);
}

fn write_line(w: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    w.write_all(bytes)?;
    w.write_all(b"\n")?;
    w.flush()
}
