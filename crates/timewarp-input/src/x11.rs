//! X11 keymap polling

use std::ffi::{c_char, c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use timewarp_core::{Modifier, ModifierSet, WarpError, WarpResult};
use timewarp_time::ModifierSource;
use x11_dl::keysym;
use x11_dl::xlib::{Display, KeySym, Xlib};

/// Raw keymap returned by `XQueryKeymap`: one bit per keycode
pub type Keymap = [u8; 32];

/// Whether `code` is set in a keymap. Keycode 0 means "no mapping" and is
/// never held.
#[inline]
pub fn keymap_contains(keys: &Keymap, code: u8) -> bool {
    code != 0 && keys[(code / 8) as usize] & (1 << (code % 8)) != 0
}

/// Held modifiers according to a keymap and the keycodes bound to them
pub fn modifiers_in(keys: &Keymap, codes: &[(Modifier, u8)]) -> ModifierSet {
    codes
        .iter()
        .filter(|(_, code)| keymap_contains(keys, *code))
        .map(|(m, _)| *m)
        .collect()
}

fn keysym_of(modifier: Modifier) -> KeySym {
    let sym = match modifier {
        Modifier::RightShift => keysym::XK_Shift_R,
        Modifier::LeftShift => keysym::XK_Shift_L,
        Modifier::RightControl => keysym::XK_Control_R,
        Modifier::LeftControl => keysym::XK_Control_L,
    };
    sym as KeySym
}

/// `XSetIOErrorExitHandler`, present in libX11 1.8 and later
type SetIoErrorExitHandlerFn = unsafe extern "C" fn(
    *mut Display,
    Option<unsafe extern "C" fn(*mut Display, *mut c_void)>,
    *mut c_void,
);

/// Called by Xlib when the connection breaks. Returning from it keeps Xlib
/// from exiting the process; the display is never used again.
unsafe extern "C" fn on_connection_lost(_display: *mut Display, lost: *mut c_void) {
    if let Some(lost) = (lost as *const AtomicBool).as_ref() {
        lost.store(true, Ordering::Release);
    }
}

/// Look up `XSetIOErrorExitHandler` in the libX11 already loaded by x11-dl
fn io_error_exit_setter() -> Option<SetIoErrorExitHandlerFn> {
    for name in [b"libX11.so.6\0".as_slice(), b"libX11.so\0".as_slice()] {
        // SAFETY: RTLD_NOLOAD only returns a library that is already mapped;
        // the extra reference is dropped again right away.
        unsafe {
            let lib = libc::dlopen(name.as_ptr() as *const c_char, libc::RTLD_LAZY | libc::RTLD_NOLOAD);
            if lib.is_null() {
                continue;
            }
            let sym = libc::dlsym(lib, b"XSetIOErrorExitHandler\0".as_ptr() as *const c_char);
            libc::dlclose(lib);
            if !sym.is_null() {
                return Some(std::mem::transmute::<*mut c_void, SetIoErrorExitHandlerFn>(sym));
            }
        }
    }
    None
}

/// Whether the peer of connection `fd` has hung up. Checked before each
/// query so libX11 without an exit handler never reaches its fatal I/O
/// error path.
pub fn connection_closed(fd: c_int) -> bool {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    const HANGUP: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL | libc::POLLRDHUP;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const HANGUP: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

    let mut pfd = libc::pollfd {
        fd,
        events: HANGUP,
        revents: 0,
    };
    // SAFETY: one valid pollfd, zero timeout.
    let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
    ready < 0 || pfd.revents & HANGUP != 0
}

/// Keyboard state of the default X display
pub struct X11Keyboard {
    xlib: Xlib,
    display: *mut Display,
    fd: c_int,
    codes: [(Modifier, u8); 4],
    // Boxed so the address handed to Xlib stays put when the keyboard moves
    lost: Box<AtomicBool>,
}

// SAFETY: Xlib is put in thread-safe mode with XInitThreads before the
// display is opened, and the display is only touched through `&mut self`.
unsafe impl Send for X11Keyboard {}

impl X11Keyboard {
    /// Load libX11 and open the default display
    pub fn open() -> WarpResult<Self> {
        let xlib = Xlib::open().map_err(|e| WarpError::InputUnavailable(e.to_string()))?;

        // SAFETY: plain Xlib calls with a null display name (use $DISPLAY).
        let display = unsafe {
            (xlib.XInitThreads)();
            (xlib.XOpenDisplay)(ptr::null())
        };
        if display.is_null() {
            return Err(WarpError::InputUnavailable(
                "cannot open X display".into(),
            ));
        }

        let codes = Modifier::ALL.map(|m| {
            // SAFETY: `display` is a live connection.
            let code = unsafe { (xlib.XKeysymToKeycode)(display, keysym_of(m)) };
            (m, code)
        });
        // SAFETY: `display` is a live connection.
        let fd = unsafe { (xlib.XConnectionNumber)(display) };

        let lost = Box::new(AtomicBool::new(false));
        let exit_handler = io_error_exit_setter();
        if let Some(set_handler) = exit_handler {
            // SAFETY: `lost` outlives the display; it is dropped after the
            // connection in `Drop` or leaked with it.
            unsafe {
                set_handler(
                    display,
                    Some(on_connection_lost),
                    &*lost as *const AtomicBool as *mut c_void,
                );
            }
        }
        tracing::debug!(?codes, fd, exit_handler = exit_handler.is_some(), "X11 keyboard opened");

        Ok(X11Keyboard {
            xlib,
            display,
            fd,
            codes,
            lost,
        })
    }

    /// Whether the X connection has gone away
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::AcqRel) {
            tracing::warn!("X connection lost; speed fixed at real time");
        }
    }

    /// Current raw keymap, or `None` once the connection is gone
    pub fn keymap(&mut self) -> Option<Keymap> {
        if self.is_lost() {
            return None;
        }
        if connection_closed(self.fd) {
            self.mark_lost();
            return None;
        }

        let mut keys: Keymap = [0; 32];
        // SAFETY: `keys` is the 32-byte buffer XQueryKeymap fills.
        unsafe {
            (self.xlib.XQueryKeymap)(self.display, keys.as_mut_ptr() as *mut c_char);
        }
        if self.is_lost() {
            // The exit handler fired during the query
            tracing::warn!("X connection lost; speed fixed at real time");
            return None;
        }
        Some(keys)
    }
}

impl ModifierSource for X11Keyboard {
    fn poll(&mut self) -> ModifierSet {
        match self.keymap() {
            Some(keys) => modifiers_in(&keys, &self.codes),
            None => ModifierSet::empty(),
        }
    }
}

impl Drop for X11Keyboard {
    fn drop(&mut self) {
        if self.is_lost() {
            // Closing a broken connection goes through the I/O error path
            // again; leak it along with the flag Xlib may still point at.
            let lost = std::mem::replace(&mut self.lost, Box::new(AtomicBool::new(true)));
            std::mem::forget(lost);
            return;
        }
        // SAFETY: opened in `open` and never closed elsewhere.
        unsafe {
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keymap_with(codes: &[u8]) -> Keymap {
        let mut keys = [0u8; 32];
        for &c in codes {
            keys[(c / 8) as usize] |= 1 << (c % 8);
        }
        keys
    }

    #[test]
    fn test_keymap_bits() {
        let keys = keymap_with(&[50, 62, 255]);
        assert!(keymap_contains(&keys, 50));
        assert!(keymap_contains(&keys, 62));
        assert!(keymap_contains(&keys, 255));
        assert!(!keymap_contains(&keys, 51));
        assert!(!keymap_contains(&keys, 0));
    }

    #[test]
    fn test_unmapped_keysym_never_held() {
        let keys = [0xffu8; 32];
        let codes = [(Modifier::RightShift, 0), (Modifier::LeftShift, 50)];
        let held = modifiers_in(&keys, &codes);
        assert!(!held.contains(Modifier::RightShift));
        assert!(held.contains(Modifier::LeftShift));
    }

    fn socket_pair() -> [c_int; 2] {
        let mut fds = [0; 2];
        let ret = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(ret, 0);
        fds
    }

    #[test]
    fn test_open_connection_is_not_closed() {
        let [ours, theirs] = socket_pair();
        assert!(!connection_closed(ours));
        unsafe {
            libc::close(ours);
            libc::close(theirs);
        }
    }

    #[test]
    fn test_hung_up_peer_is_detected() {
        let [ours, theirs] = socket_pair();
        unsafe { libc::close(theirs) };
        assert!(connection_closed(ours));
        unsafe { libc::close(ours) };
    }

    #[test]
    fn test_io_error_exit_handler_marks_connection_lost() {
        let lost = Box::new(AtomicBool::new(false));
        unsafe {
            on_connection_lost(ptr::null_mut(), &*lost as *const AtomicBool as *mut c_void);
            on_connection_lost(ptr::null_mut(), ptr::null_mut());
        }
        assert!(lost.load(Ordering::Acquire));
    }

    #[test]
    fn test_modifiers_from_typical_layout() {
        // Common evdev codes: Shift_L 50, Shift_R 62, Control_L 37, Control_R 105
        let codes = [
            (Modifier::RightShift, 62),
            (Modifier::LeftShift, 50),
            (Modifier::RightControl, 105),
            (Modifier::LeftControl, 37),
        ];
        let held = modifiers_in(&keymap_with(&[62, 37]), &codes);
        assert!(held.contains(Modifier::RightShift));
        assert!(held.contains(Modifier::LeftControl));
        assert!(!held.contains(Modifier::LeftShift));
        assert!(!held.contains(Modifier::RightControl));
    }
}
