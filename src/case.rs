use convert_case::{Case, Casing};

/// String naming convention (case) types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringCase {
    Pascal,         // HelloWorld
    Kebab,          // hello-world
    Camel,          // helloWorld
    ScreamingSnake, // HELLO_WORLD
    Snake,          // hello_world
}

impl StringCase {
    /// Look up a case style by the method name used in transform expressions
    ///
    /// # Arguments
    /// * `name` - Method name such as `snake` or `screaming_snake`
    ///
    /// # Returns
    /// * `Option<StringCase>` - The case style, if the name is known
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "pascal" => Some(StringCase::Pascal),
            "kebab" => Some(StringCase::Kebab),
            "camel" => Some(StringCase::Camel),
            "screaming_snake" => Some(StringCase::ScreamingSnake),
            "snake" => Some(StringCase::Snake),
            _ => None,
        }
    }
}

/// Convert a string to a specified case style
///
/// # Arguments
/// * `s` - The string to convert
/// * `case_type` - The target case style
///
/// # Returns
/// * `String` - The converted string
pub fn convert_case(s: &str, case_type: StringCase) -> String {
    match case_type {
        StringCase::Pascal => s.to_case(Case::Pascal),
        StringCase::Kebab => s.to_case(Case::Kebab),
        StringCase::Camel => s.to_case(Case::Camel),
        StringCase::ScreamingSnake => s.to_case(Case::UpperSnake),
        StringCase::Snake => s.to_case(Case::Snake),
    }
}

/// Python style title casing: the first letter of every run of letters is
/// upper case, the rest lower case
pub fn title(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }
    result
}

/// Upper case the first character and lower case the rest
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Flip the case of every character
pub fn swapcase(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_uppercase() {
            result.extend(c.to_lowercase());
        } else if c.is_lowercase() {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
    }
    result
}
