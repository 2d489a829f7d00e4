use std::cell::RefCell;
use std::ffi::{c_char, CStr};
use std::io::Write;
use std::ptr;

thread_local! {
    static CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Run `f`, collecting everything the runtime prints on this thread.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, String) {
    let previous = CAPTURE.with(|slot| slot.borrow_mut().replace(String::new()));
    let result = f();
    let output = CAPTURE.with(|slot| {
        let mut slot = slot.borrow_mut();
        let output = slot.take().unwrap_or_default();
        *slot = previous;
        output
    });
    (result, output)
}

fn write_output(text: &str) {
    let captured = CAPTURE.with(|slot| match slot.borrow_mut().as_mut() {
        Some(buffer) => {
            buffer.push_str(text);
            true
        }
        None => false,
    });

    if !captured {
        let mut stdout = std::io::stdout().lock();
        // Generated code has nowhere to report an I/O failure.
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// `puts`: write a NUL-terminated string and a newline.
///
/// # Safety
/// `text` must be null or point to a NUL-terminated string.
pub unsafe extern "C" fn opal_puts(text: *const c_char) -> i32 {
    if text.is_null() {
        return -1;
    }
    let text = CStr::from_ptr(text).to_string_lossy();
    write_output(&text);
    write_output("\n");
    1
}

/// `printf` restricted to a single `double` argument.
///
/// # Safety
/// `format` must be null or point to a NUL-terminated string.
pub unsafe extern "C" fn opal_printf(format: *const c_char, value: f64) -> i32 {
    if format.is_null() {
        return -1;
    }
    let format = CStr::from_ptr(format).to_string_lossy();
    let text = render_format(&format, value);
    write_output(&text);
    i32::try_from(text.len()).unwrap_or(i32::MAX)
}

/// Expand `%g` (once) and `%%` in `format`. Other directives are copied as-is.
pub fn render_format(format: &str, value: f64) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars();
    let mut consumed = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('g') if !consumed => {
                out.push_str(&format_g(value));
                consumed = true;
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// C's `%g`: six significant digits, trailing zeros removed, scientific
/// notation below 1e-4 or from 1e6 on.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return if value.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(mantissa), exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        strip_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// `int_to_string`: render `value` in `radix` into `buffer`, NUL-terminated.
///
/// Radixes outside `2..=36` fall back to 10.
///
/// # Safety
/// `buffer` must have room for the digits, a sign and the terminator
/// (12 bytes for radix 10).
pub unsafe extern "C" fn opal_int_to_string(value: i32, buffer: *mut c_char, radix: i32) -> *mut c_char {
    if buffer.is_null() {
        return buffer;
    }
    let text = render_int(value, radix);
    ptr::copy_nonoverlapping(text.as_ptr().cast::<c_char>(), buffer, text.len());
    *buffer.add(text.len()) = 0;
    buffer
}

pub fn render_int(value: i32, radix: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let radix = if (2..=36).contains(&radix) { radix as u64 } else { 10 };
    let mut magnitude = i64::from(value).unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % radix) as usize]);
        magnitude /= radix;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.iter().rev().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn formats_like_c_g() {
        assert_eq!(format_g(7.75), "7.75");
        assert_eq!(format_g(3.0), "3");
        assert_eq!(format_g(100000.0), "100000");
        assert_eq!(format_g(1e6), "1e+06");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(1.5e-5), "1.5e-05");
        assert_eq!(format_g(0.1 + 0.2), "0.3");
        assert_eq!(format_g(-2.5), "-2.5");
        assert_eq!(format_g(3.14159265), "3.14159");
    }

    #[test]
    fn expands_format_directives() {
        assert_eq!(render_format("%g\n", 1.5), "1.5\n");
        assert_eq!(render_format("100%% %g", 2.0), "100% 2");
    }

    #[test]
    fn renders_integers_in_any_radix() {
        assert_eq!(render_int(0, 10), "0");
        assert_eq!(render_int(-42, 10), "-42");
        assert_eq!(render_int(255, 16), "ff");
        assert_eq!(render_int(5, 2), "101");
        assert_eq!(render_int(i32::MIN, 10), "-2147483648");
        assert_eq!(render_int(7, 99), "7");
    }

    #[test]
    fn int_to_string_fills_the_buffer() {
        let mut buffer = [0 as c_char; 12];
        let out = unsafe { opal_int_to_string(-2147483648, buffer.as_mut_ptr(), 10) };
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap();
        assert_eq!(text, "-2147483648");
    }

    #[test]
    fn capture_collects_puts_and_printf() {
        let line = CString::new("hello").unwrap();
        let format = CString::new("%g\n").unwrap();
        let ((), output) = capture(|| unsafe {
            opal_puts(line.as_ptr());
            opal_printf(format.as_ptr(), 7.75);
        });
        assert_eq!(output, "hello\n7.75\n");
    }

    #[test]
    fn nested_capture_restores_the_outer_buffer() {
        let outer_text = CString::new("outer").unwrap();
        let inner_text = CString::new("inner").unwrap();
        let (inner, outer) = capture(|| {
            let ((), inner) = capture(|| unsafe {
                opal_puts(inner_text.as_ptr());
            });
            unsafe { opal_puts(outer_text.as_ptr()) };
            inner
        });
        assert_eq!(inner, "inner\n");
        assert_eq!(outer, "outer\n");
    }
}
