use heapless::String;

/// Returns the substring after the first occurrence of `delimiter`, if present.
pub fn after_first<'a>(input: &'a str, delimiter: &str) -> Option<&'a str> {
    input.split_once(delimiter).map(|(_, suffix)| suffix)
}

/// Returns the substring before the first occurrence of `delimiter`, if present.
///
/// Example: `before_first("17,99", ',')` is `Some("17")`.
pub fn before_first(input: &str, delimiter: char) -> Option<&str> {
    input.split_once(delimiter).map(|(prefix, _)| prefix)
}

/// Returns the substring after the last occurrence of `delimiter`, if present.
///
/// Example: `after_last("+CMTI: \"SM\",5", ',')` is `Some("5")`.
pub fn after_last(input: &str, delimiter: char) -> Option<&str> {
    input.rfind(delimiter).map(|at| &input[at + delimiter.len_utf8()..])
}

/// Copies `input` into a fixed-capacity string, dropping whatever does not fit.
pub fn clipped<const N: usize>(input: &str) -> String<N> {
    let mut out = String::new();
    for chr in input.chars() {
        if out.push(chr).is_err() {
            break;
        }
    }
    out
}
