//! Identity functions called through prepared descriptors return their input

use cifbind::{Cif, FfiType, Signature};
use proptest::prelude::*;

extern "C" fn identity<T: Copy>(value: T) -> T {
    value
}

fn round_trip<T>(value: T) -> T
where
    T: FfiType + Copy + 'static,
    extern "C" fn(T) -> T: Signature<Args = (T,), Output = T>,
{
    let cif = Cif::<extern "C" fn(T) -> T>::new().unwrap();
    cif.bind(identity::<T>).invoke((value,))
}

proptest! {
    #[test]
    fn test_u8(v in any::<u8>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_i8(v in any::<i8>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_u16(v in any::<u16>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_i16(v in any::<i16>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_u32(v in any::<u32>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_i32(v in any::<i32>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_u64(v in any::<u64>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_i64(v in any::<i64>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_bool(v in any::<bool>()) { prop_assert_eq!(round_trip(v), v); }

    #[test]
    fn test_f32(v in proptest::num::f32::NORMAL | proptest::num::f32::ZERO) {
        prop_assert_eq!(round_trip(v).to_bits(), v.to_bits());
    }

    #[test]
    fn test_f64(v in proptest::num::f64::NORMAL | proptest::num::f64::SUBNORMAL | proptest::num::f64::ZERO) {
        prop_assert_eq!(round_trip(v).to_bits(), v.to_bits());
    }

    #[test]
    fn test_pointer(addr in any::<usize>()) {
        let ptr = addr as *const u8;
        prop_assert_eq!(round_trip(ptr), ptr);
    }

    #[test]
    fn test_mixed_arguments(a in any::<i8>(), b in any::<u32>(), c in any::<f64>(), d in any::<i64>()) {
        extern "C" fn pick(a: i8, b: u32, c: f64, d: i64) -> i64 {
            if c.is_nan() { a as i64 } else { d.wrapping_add(b as i64) }
        }

        let cif = Cif::<extern "C" fn(i8, u32, f64, i64) -> i64>::new().unwrap();
        let ctx = cif.bind(pick).call((a, b, c, d));
        prop_assert_eq!(ctx.ret(), pick(a, b, c, d));
        prop_assert_eq!(ctx.args().1, b);
    }
}
