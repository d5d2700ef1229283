#[cfg(feature = "logging")]
macro_rules! log {
    ( $fmt:expr ) => {
        eprintln!($fmt);
    };
    ( $fmt:expr, $($x:tt)* ) => {
        eprintln!($fmt, $($x)*);
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log {
    ( $fmt:expr ) => {};
    ( $fmt:expr, $($x:tt)* ) => {
        if false {
            let _ = format!($fmt, $($x)*);
        }
    };
}
