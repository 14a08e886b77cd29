use cifbind::{call, Abi, Cif, FfiType, PrepError, TypeDescriptor, TypeRegistry};
use std::sync::atomic::{AtomicI32, Ordering};

extern "C" fn zero() -> i32 {
    0
}

extern "C" fn factorial(n: i32) -> i32 {
    if n > 1 {
        factorial(n - 1) * n
    } else {
        1
    }
}

static COUNT: AtomicI32 = AtomicI32::new(0);

extern "C" fn counter(reset: bool) -> i32 {
    if reset {
        COUNT.store(0, Ordering::SeqCst);
        0
    } else {
        COUNT.fetch_add(1, Ordering::SeqCst)
    }
}

#[test]
fn test_nullary_function_three_times() {
    let cif = Cif::<extern "C" fn() -> i32>::new().unwrap();
    let f = cif.bind(zero);
    let results: Vec<i32> = (0..3).map(|_| f.call(()).ret()).collect();
    assert_eq!(results, vec![0, 0, 0]);
}

#[test]
fn test_factorial() {
    let cif = Cif::<extern "C" fn(i32) -> i32>::new().unwrap();
    let f = cif.bind(factorial);
    let results: Vec<i32> = [0, 1, 2, 3, 10].into_iter().map(|n| f.invoke((n,))).collect();
    assert_eq!(results, vec![1, 1, 2, 6, 3628800]);
}

#[test]
fn test_counter_with_reset() {
    let cif = Cif::<extern "C" fn(bool) -> i32>::new().unwrap();
    let f = cif.bind(counter);
    let results: Vec<i32> = [false, false, false, true]
        .into_iter()
        .map(|reset| f.call((reset,)).ret())
        .collect();
    assert_eq!(results, vec![0, 1, 2, 0]);
}

cifbind::ffi_struct! {
    pub struct NoFields {}
}

#[repr(C)]
struct Triple {
    a: u8,
    b: u64,
    c: u8,
}

// Claims two u8 fields; the real struct is 24 bytes.
unsafe impl FfiType for Triple {
    type Widened = Self;

    fn descriptor() -> TypeDescriptor {
        TypeRegistry::structure::<Self>(|| vec![u8::descriptor(), u8::descriptor()])
    }

    fn narrow(raw: Self) -> Self {
        raw
    }
}

#[test]
fn test_malformed_aggregates_rejected() {
    assert_eq!(
        Cif::<extern "C" fn(NoFields) -> i32>::new().unwrap_err(),
        PrepError::BadTypeLayout
    );
    assert_eq!(
        Cif::<extern "C" fn(i32, Triple)>::new().unwrap_err(),
        PrepError::BadTypeLayout
    );

    let triple = Triple { a: 1, b: 2, c: 3 };
    assert_eq!(triple.a as u64 + triple.b + triple.c as u64, 6);
}

#[test]
fn test_unsupported_abi() {
    let err = Cif::<extern "C" fn(i32) -> i32>::with_abi(Abi::Raw(0)).unwrap_err();
    assert_eq!(err, PrepError::UnsupportedAbi);
    assert_eq!(err.to_string(), "unsupported calling convention");
}

#[test]
fn test_one_shot_call() {
    assert_eq!(call::<extern "C" fn(i32) -> i32>(factorial, (5,)), Ok(120));
    assert_eq!(
        call::<extern "C" fn(NoFields) -> i32>(take_nothing, (NoFields {},)),
        Err(PrepError::BadTypeLayout)
    );
}

extern "C" fn take_nothing(_value: NoFields) -> i32 {
    1
}

#[test]
fn test_return_by_reference_and_move() {
    let cif = Cif::<extern "C" fn(i32) -> i32>::new().unwrap();
    let mut ctx = cif.bind(factorial).call((6,));

    let by_ref = ctx.ret_ref();
    assert_eq!(*by_ref, 720);

    let moved = ctx.take_ret();
    assert_eq!(moved, 720);
    assert_eq!(ctx.ret(), 0);
}
