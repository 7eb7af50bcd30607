/// Returns true if `name` is a letter or underscore followed by letters, digits and underscores.
pub(crate) fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => (),
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Returns true if `name` is a valid identifier starting with an uppercase letter.
pub(crate) fn is_valid_type_name(name: &str) -> bool {
    name.starts_with(|ch: char| ch.is_ascii_uppercase()) && is_valid_ident(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents() {
        assert!(is_valid_ident("foo"));
        assert!(is_valid_ident("_foo_1"));
        assert!(is_valid_ident("Foo"));
        assert!(!is_valid_ident(""));
        assert!(!is_valid_ident("1foo"));
        assert!(!is_valid_ident("foo-bar"));
        assert!(!is_valid_ident("foo.bar"));
    }

    #[test]
    fn type_names() {
        assert!(is_valid_type_name("Foo"));
        assert!(is_valid_type_name("FooBar_2"));
        assert!(!is_valid_type_name("foo"));
        assert!(!is_valid_type_name("_Foo"));
        assert!(!is_valid_type_name("Foo.Bar"));
    }
}
