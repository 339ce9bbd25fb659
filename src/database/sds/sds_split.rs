use kvprim_error::SdsError;
use memchr::memmem;
use tracing::debug;

use super::Sds;

/// Разбивает `s` по разделителю `sep` (может быть многобайтовым).
///
/// Совпадения не перекрываются, пустые поля сохраняются: `"a,,b"` по `","`
/// даёт `["a", "", "b"]`. Пустой вход даёт пустой список, пустой разделитель
/// возвращает вход целиком одним элементом.
///
/// ```
/// use kvprim::database::sds::split_len;
///
/// let parts = split_len(b"foo_-_bar", b"_-_");
/// assert_eq!(parts.len(), 2);
/// assert_eq!(parts[0].as_bytes(), b"foo");
/// assert_eq!(parts[1].as_bytes(), b"bar");
/// ```
pub fn split_len(
    s: &[u8],
    sep: &[u8],
) -> Vec<Sds> {
    if s.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return vec![Sds::new_len(s)];
    }

    let mut tokens = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(s, sep) {
        tokens.push(Sds::new_len(&s[start..pos]));
        start = pos + sep.len();
    }
    tokens.push(Sds::new_len(&s[start..]));

    tokens
}

/// Склеивает части через разделитель. Обратная операция к [`split_len`].
pub fn join<T: AsRef<[u8]>>(
    parts: &[T],
    sep: &[u8],
) -> Sds {
    let total = parts.iter().map(|p| p.as_ref().len()).sum::<usize>()
        + sep.len() * parts.len().saturating_sub(1);

    let mut out = Vec::with_capacity(total);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(sep);
        }
        out.extend_from_slice(part.as_ref());
    }

    Sds::from(out)
}

/// Разбирает строку команды на аргументы по правилам консольного ввода.
///
/// - аргументы разделяются пробельными символами;
/// - в двойных кавычках работают `\n \r \t \b \a`, `\xHH` и `\<любой>`;
/// - в одинарных кавычках экранируется только `\'`;
/// - за закрывающей кавычкой должен идти пробел или конец строки;
/// - нулевой байт завершает ввод.
///
/// Пустая или состоящая из пробелов строка даёт пустой список.
///
/// ```
/// use kvprim::database::sds::split_args;
///
/// let args = split_args(br#"set "a b" 'c'"#).unwrap();
/// let args: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
/// assert_eq!(args, [&b"set"[..], b"a b", b"c"]);
///
/// assert!(split_args(br#""foo"bar"#).is_err());
/// ```
pub fn split_args(line: &[u8]) -> Result<Vec<Sds>, SdsError> {
    let line = match memchr::memchr(0, line) {
        Some(end) => &line[..end],
        None => line,
    };

    let mut args = Vec::new();
    let mut p = 0;

    loop {
        while p < line.len() && is_space(line[p]) {
            p += 1;
        }
        if p >= line.len() {
            return Ok(args);
        }

        let mut in_dq = false;
        let mut in_sq = false;
        let mut done = false;
        let mut current = Vec::new();

        while !done {
            if in_dq {
                let Some(&c) = line.get(p) else {
                    return Err(unbalanced(line, p));
                };

                if c == b'\\'
                    && line.get(p + 1) == Some(&b'x')
                    && line.get(p + 2).is_some_and(u8::is_ascii_hexdigit)
                    && line.get(p + 3).is_some_and(u8::is_ascii_hexdigit)
                {
                    current.push(hex_value(line[p + 2]) * 16 + hex_value(line[p + 3]));
                    p += 3;
                } else if c == b'\\' && p + 1 < line.len() {
                    p += 1;
                    current.push(match line[p] {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'b' => 0x08,
                        b'a' => 0x07,
                        other => other,
                    });
                } else if c == b'"' {
                    if line.get(p + 1).is_some_and(|&n| !is_space(n)) {
                        return Err(unbalanced(line, p + 1));
                    }
                    done = true;
                } else {
                    current.push(c);
                }
            } else if in_sq {
                let Some(&c) = line.get(p) else {
                    return Err(unbalanced(line, p));
                };

                if c == b'\\' && line.get(p + 1) == Some(&b'\'') {
                    p += 1;
                    current.push(b'\'');
                } else if c == b'\'' {
                    if line.get(p + 1).is_some_and(|&n| !is_space(n)) {
                        return Err(unbalanced(line, p + 1));
                    }
                    done = true;
                } else {
                    current.push(c);
                }
            } else {
                match line.get(p) {
                    None | Some(b' ' | b'\n' | b'\r' | b'\t') => done = true,
                    Some(b'"') => in_dq = true,
                    Some(b'\'') => in_sq = true,
                    Some(&c) => current.push(c),
                }
            }

            if p < line.len() {
                p += 1;
            }
        }

        args.push(Sds::from(current));
    }
}

/// Пробельные символы в смысле C `isspace`.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

#[inline]
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

fn unbalanced(
    line: &[u8],
    offset: usize,
) -> SdsError {
    debug!(offset, len = line.len(), "unbalanced quotes in argument line");
    SdsError::UnbalancedQuotes { offset }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
