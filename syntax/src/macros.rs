// Every parser in this crate runs over a `&str` range stream, and some of them
// convert matched text into numbers, so they all share the same where-clause.
macro_rules! str_parser (
    ($name:ident [$($gen:tt)*] ( $($arg:ident : $arg_type:ty),* ) -> $ret:ty, [$($bounds:tt)*], $code:expr) => (
        combine::parser!{
            pub fn $name['a, I $($gen)*]($($arg : $arg_type),*)(I) -> $ret
                where
                [I: combine::stream::RangeStream<
                 Range = &'a str,
                 Token = char>,
                 I::Error: combine::ParseError<char, &'a str, <I as combine::stream::StreamOnce>::Position>,
                 <I::Error as combine::ParseError<char, &'a str, <I as combine::stream::StreamOnce>::Position>>::StreamError:
                 From<std::num::ParseIntError> +
                 From<std::num::ParseFloatError>,
                 $($bounds)*
            ]            {
                $code
            }
        }
    );
);

/// A plain parser function.
macro_rules! p (
    ($name:ident( $($arg:ident : $arg_type:ty),* ) -> $ret:ty, $code:expr) => (
        str_parser!($name [] ($($arg : $arg_type),*) -> $ret, [], $code);
    );
);

/// A parser that wraps another parser and keeps its output.
macro_rules! wrapper {
    ($name:ident($delegate:ident), $code:expr) => (
        str_parser!($name [, P] ($delegate: P) -> P::Output, [P: combine::Parser<I>,], $code);
    );
}

/// A parser that repeats another parser and collects its outputs.
macro_rules! repeater {
    ($name:ident($delegate:ident), $code:expr) => (
        str_parser!($name [, P] ($delegate: P) -> Vec<P::Output>, [P: combine::Parser<I>,], $code);
    );
}
