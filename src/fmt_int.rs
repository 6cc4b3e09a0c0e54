//! Allocation-free decimal integer formatting, used for Content-Length.

fn build_table() -> [u8; 200] {
    let mut t = [0u8; 200];
    let mut i = 0u8;
    loop {
        let idx = (i as usize) * 2;
        t[idx] = b'0' + (i / 10);
        t[idx + 1] = b'0' + (i % 10);
        if i == 99 {
            break;
        }
        i += 1;
    }
    t
}

use std::sync::OnceLock;
static TABLE_CELL: OnceLock<[u8; 200]> = OnceLock::new();

#[allow(non_snake_case)]
fn TABLE() -> &'static [u8; 200] {
    TABLE_CELL.get_or_init(build_table)
}

/// Writes `value` as decimal digits into `buf`, returning the number of bytes written.
/// Writes right-to-left and shifts the result to the front of `buf`.
pub fn format_u64(mut value: u64, buf: &mut [u8; 20]) -> usize {
    let table = TABLE();
    let mut pos = buf.len();

    while value >= 100 {
        let pair = (value % 100) as usize * 2;
        pos -= 2;
        buf[pos] = table[pair];
        buf[pos + 1] = table[pair + 1];
        value /= 100;
    }

    if value >= 10 {
        let pair = value as usize * 2;
        pos -= 2;
        buf[pos] = table[pair];
        buf[pos + 1] = table[pair + 1];
    } else {
        pos -= 1;
        buf[pos] = b'0' + value as u8;
    }

    let len = buf.len() - pos;
    buf.copy_within(pos.., 0);
    len
}

/// Writes `value` as a signed decimal into `buf`, returning the number of bytes written.
pub fn format_i64(value: i64, buf: &mut [u8; 21]) -> usize {
    if value < 0 {
        let mut tmp = [0u8; 20];
        let unsigned = value.unsigned_abs();
        let n = format_u64(unsigned, &mut tmp);
        buf[0] = b'-';
        buf[1..=n].copy_from_slice(&tmp[..n]);
        n + 1
    } else {
        let mut tmp = [0u8; 20];
        let n = format_u64(value as u64, &mut tmp);
        buf[..n].copy_from_slice(&tmp[..n]);
        n
    }
}

pub fn format_u64_string(value: u64) -> String {
    let mut buf = [0u8; 20];
    let n = format_u64(value, &mut buf);
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_zero() {
        assert_eq!(format_u64_string(0), "0");
    }

    #[test]
    fn formats_single_digit() {
        assert_eq!(format_u64_string(7), "7");
    }

    #[test]
    fn formats_two_digits() {
        assert_eq!(format_u64_string(42), "42");
    }

    #[test]
    fn formats_large_values() {
        assert_eq!(format_u64_string(123456789), "123456789");
        assert_eq!(format_u64_string(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn round_trips_over_a_range() {
        for n in (0u64..5000).chain([u64::MAX, u64::MAX - 1, 1_000_000_000_000]) {
            let s = format_u64_string(n);
            assert_eq!(s.parse::<u64>().unwrap(), n);
        }
    }

    #[test]
    fn formats_negative_signed() {
        let mut buf = [0u8; 21];
        let n = format_i64(-42, &mut buf);
        assert_eq!(&buf[..n], b"-42");
    }

    #[test]
    fn formats_positive_signed() {
        let mut buf = [0u8; 21];
        let n = format_i64(42, &mut buf);
        assert_eq!(&buf[..n], b"42");
    }
}
