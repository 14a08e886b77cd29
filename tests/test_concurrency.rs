//! Shared descriptors and callables used from many threads

use cifbind::{Cif, FfiType, TypeRegistry};
use rayon::prelude::*;

extern "C" fn square(n: i64) -> i64 {
    n * n
}

extern "C" fn negate(n: i64) -> i64 {
    -n
}

#[test]
fn test_shared_callable() {
    let cif = Cif::<extern "C" fn(i64) -> i64>::new().unwrap();
    let f = cif.bind(square);

    let results: Vec<i64> = (0..10_000i64).into_par_iter().map(|n| f.invoke((n,))).collect();
    assert!(results.iter().enumerate().all(|(n, r)| *r == (n as i64) * (n as i64)));
}

#[test]
fn test_independent_descriptors_same_signature() {
    let first = Cif::<extern "C" fn(i64) -> i64>::new().unwrap();
    let second = Cif::<extern "C" fn(i64) -> i64>::new().unwrap();

    let (a, b) = rayon::join(
        || (0..1_000i64).map(|n| first.bind(square).invoke((n,))).sum::<i64>(),
        || (0..1_000i64).map(|n| second.bind(negate).invoke((n,))).sum::<i64>(),
    );

    assert_eq!(a, (0..1_000i64).map(|n| n * n).sum::<i64>());
    assert_eq!(b, -(0..1_000i64).sum::<i64>());
}

cifbind::ffi_struct! {
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct Rgb {
        pub r: u8,
        pub g: u8,
        pub b: u8,
    }
}

cifbind::ffi_struct! {
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct Pixel {
        pub x: u16,
        pub y: u16,
        pub color: Rgb,
    }
}

extern "C" fn invert(pixel: Pixel) -> Pixel {
    Pixel {
        color: Rgb {
            r: 255 - pixel.color.r,
            g: 255 - pixel.color.g,
            b: 255 - pixel.color.b,
        },
        ..pixel
    }
}

#[test]
fn test_concurrent_preparation_of_aggregates() {
    let outcomes: Vec<Pixel> = (0..256u16)
        .into_par_iter()
        .map(|i| {
            let cif = Cif::<extern "C" fn(Pixel) -> Pixel>::new().unwrap();
            let pixel = Pixel {
                x: i,
                y: i * 2,
                color: Rgb { r: i as u8, g: 0, b: 255 },
            };
            cif.bind(invert).invoke((pixel,))
        })
        .collect();

    for (i, pixel) in outcomes.iter().enumerate() {
        assert_eq!(pixel.x as usize, i);
        assert_eq!(pixel.color, Rgb { r: 255 - i as u8, g: 255, b: 0 });
    }

    let registry = TypeRegistry::global();
    assert_eq!(registry.lookup::<Pixel>(), Some(Pixel::descriptor()));
    assert_eq!(Pixel::descriptor().size(), std::mem::size_of::<Pixel>());
}
