//! Native-C builtin entry points.
//!
//! These are the slow-path runtime fallbacks reached through
//! [`Builtins::cpp_entry`](crate::Builtins::cpp_entry). They use the raw
//! numeric ABI: arguments and result are `f64` bit patterns.

/// Signature of a native builtin entry point.
pub type NativeFunction = fn(args: &[u64]) -> u64;

fn nan_bits() -> u64 {
    f64::NAN.to_bits()
}

/// `Math.pow` fallback
pub fn math_pow(args: &[u64]) -> u64 {
    match args {
        [base, exponent, ..] => f64::from_bits(*base).powf(f64::from_bits(*exponent)).to_bits(),
        _ => nan_bits(),
    }
}

/// `Math.fround` fallback
pub fn math_fround(args: &[u64]) -> u64 {
    match args {
        [value, ..] => f64::from(f64::from_bits(*value) as f32).to_bits(),
        _ => nan_bits(),
    }
}

/// `Math.cbrt` fallback
pub fn math_cbrt(args: &[u64]) -> u64 {
    match args {
        [value, ..] => f64::from_bits(*value).cbrt().to_bits(),
        _ => nan_bits(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_pow() {
        let result = math_pow(&[2.0f64.to_bits(), 3.0f64.to_bits()]);
        assert_eq!(f64::from_bits(result), 8.0);
    }

    #[test]
    fn test_math_fround_narrows() {
        let result = math_fround(&[1.1f64.to_bits()]);
        assert_eq!(f64::from_bits(result), f64::from(1.1f32));
    }

    #[test]
    fn test_missing_arguments_yield_nan() {
        assert!(f64::from_bits(math_cbrt(&[])).is_nan());
        assert!(f64::from_bits(math_pow(&[2.0f64.to_bits()])).is_nan());
    }
}
