//! Fixed macro dictionary expanded textually, before parsing.
//! Expansion is whole-word and case-sensitive: a macro
//! name embedded inside a longer identifier (`backbones`) is left
//! untouched.

const MACROS: &[(&str, &str)] = &[
    ("backbone", "(name C CA O N)"),
    ("acidic", "(resname ASP GLU)"),
    ("cyclic", "(resname HIS PHE PRO TRP TYR)"),
    ("aromatic", "(resname HIS PHE TRP TYR)"),
    ("basic", "(resname ARG HIS LYS HSP)"),
    ("buried", "(resname ALA LEU VAL ILE PHE CYS MET TRP)"),
    ("charged", "(resname ARG HIS LYS HSP ASP GLU)"),
    ("hydrophobic", "(resname ALA LEU VAL ILE PRO PHE MET TRP)"),
];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand every whole-word macro occurrence in `text`, scanning
/// left to right so a macro's own expansion is never re-scanned for
/// further macro names.
pub fn expand(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    'outer: while i < chars.len() {
        if is_word_char(chars[i]) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            for (name, expansion) in MACROS {
                if word == *name {
                    out.push_str(expansion);
                    continue 'outer;
                }
            }
            out.push_str(&word);
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_macro() {
        assert_eq!(expand("acidic"), "(resname ASP GLU)");
    }

    #[test]
    fn leaves_longer_identifier_untouched() {
        assert_eq!(expand("acidick"), "acidick");
    }

    #[test]
    fn expands_within_larger_expression() {
        assert_eq!(expand("backbone and not cyclic"), "(name C CA O N) and not (resname HIS PHE PRO TRP TYR)");
    }
}
