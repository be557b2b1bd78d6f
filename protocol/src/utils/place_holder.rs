use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

// 定义 PlaceHolder trait
pub trait PlaceHolderRender {
    /// 将 `{{key}}` 占位符替换为实际值
    ///
    /// Unknown keys and unterminated braces are kept verbatim. Substituted
    /// values are never scanned again, so a value containing `{{x}}` stays literal.
    fn render(&self, vars: &HashMap<String, String>) -> String;
}

impl PlaceHolderRender for str {
    fn render(&self, vars: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.len());
        let mut rest = self;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            match match_token(candidate, vars) {
                Some((value, token_len)) => {
                    out.push_str(value);
                    rest = &candidate[token_len..];
                }
                None => {
                    // not a known token here, retry one brace further on
                    out.push('{');
                    rest = &candidate[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// The value of the `{{key}}` that `text` starts with, and that token's length.
fn match_token<'a>(text: &str, vars: &'a HashMap<String, String>) -> Option<(&'a str, usize)> {
    let inner = text.strip_prefix(OPEN)?;
    vars.iter()
        .filter(|(key, _)| {
            inner
                .strip_prefix(key.as_str())
                .is_some_and(|tail| tail.starts_with(CLOSE))
        })
        .max_by_key(|(key, _)| key.len())
        .map(|(key, value)| (value.as_str(), OPEN.len() + key.len() + CLOSE.len()))
}

impl PlaceHolderRender for String {
    fn render(&self, vars: &HashMap<String, String>) -> String {
        self.as_str().render(vars)
    }
}
