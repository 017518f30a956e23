//! Output file naming.
//!
//! Each prompt becomes a file name by collapsing every run of whitespace
//! into a single underscore. Prompts that collapse to the same name are
//! handled according to a [`CollisionPolicy`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AudioGenError, Result};

/// Longest file name accepted by common filesystems, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// What to do when two prompts map to the same output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Abort before generating anything.
    #[default]
    Fail,
    /// Append `_1`, `_2`, ... to later colliding names.
    Suffix,
    /// Write to the same path again; the last prompt wins.
    ///
    /// Names are compared exactly, so prompts differing only in case keep
    /// separate files on case-sensitive filesystems.
    Overwrite,
}

impl CollisionPolicy {
    /// Returns the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionPolicy::Fail => "fail",
            CollisionPolicy::Suffix => "suffix",
            CollisionPolicy::Overwrite => "overwrite",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fail" => Some(CollisionPolicy::Fail),
            "suffix" => Some(CollisionPolicy::Suffix),
            "overwrite" => Some(CollisionPolicy::Overwrite),
            _ => None,
        }
    }
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns true for Unicode whitespace and the ASCII separators
/// U+001C..=U+001F (file, group, record and unit separator).
fn is_name_whitespace(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Replaces every maximal run of whitespace with a single `_`.
///
/// Leading and trailing runs are replaced too: `" a  b "` becomes `"_a_b_"`.
pub fn normalize_prompt(prompt: &str) -> String {
    let mut out = String::with_capacity(prompt.len());
    let mut in_whitespace = false;
    for c in prompt.chars() {
        if is_name_whitespace(c) {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

/// Derives the output file name for a prompt.
///
/// Fails with `INVALID_PROMPT` if the result would not be a single,
/// safe path component.
pub fn file_name_for(prompt: &str, extension: &str) -> Result<String> {
    if prompt.is_empty() {
        return Err(AudioGenError::invalid_prompt(prompt, "prompt is empty"));
    }
    if prompt.contains(['/', '\\', '\0']) {
        return Err(AudioGenError::invalid_prompt(
            prompt,
            "prompt contains a path separator or NUL character",
        ));
    }

    let stem = normalize_prompt(prompt);
    if stem == "." || stem == ".." {
        return Err(AudioGenError::invalid_prompt(
            prompt,
            "prompt names a relative directory",
        ));
    }

    let file_name = format!("{}.{}", stem, extension);
    if file_name.len() > MAX_FILE_NAME_BYTES {
        return Err(AudioGenError::invalid_prompt(
            prompt,
            format!(
                "file name is {} bytes (maximum {})",
                file_name.len(),
                MAX_FILE_NAME_BYTES
            ),
        ));
    }

    Ok(file_name)
}

/// Plans one output path per prompt, in prompt order.
///
/// Collisions are resolved by `policy`. `Fail` and `Suffix` compare names
/// case-insensitively; `Overwrite` compares them exactly.
pub fn plan_output_paths<S: AsRef<str>>(
    prompts: &[S],
    output_dir: &Path,
    extension: &str,
    policy: CollisionPolicy,
) -> Result<Vec<PathBuf>> {
    if prompts.is_empty() {
        return Err(AudioGenError::no_prompts());
    }

    let key_for = |name: &str| match policy {
        CollisionPolicy::Overwrite => name.to_string(),
        CollisionPolicy::Fail | CollisionPolicy::Suffix => name.to_lowercase(),
    };

    // Comparison key of a file name -> index of the prompt that claimed it.
    let mut taken: HashMap<String, usize> = HashMap::with_capacity(prompts.len());
    let mut names: Vec<String> = Vec::with_capacity(prompts.len());

    for (index, prompt) in prompts.iter().enumerate() {
        let prompt = prompt.as_ref();
        let file_name = file_name_for(prompt, extension)?;
        let key = key_for(&file_name);

        let name = match taken.get(&key) {
            None => file_name,
            Some(&first) => match policy {
                CollisionPolicy::Fail => {
                    return Err(AudioGenError::name_collision(
                        prompts[first].as_ref(),
                        prompt,
                        &file_name,
                    ));
                }
                CollisionPolicy::Overwrite => {
                    tracing::warn!(
                        file = %file_name,
                        "prompt {:?} overwrites the output of {:?}",
                        prompt,
                        prompts[first].as_ref()
                    );
                    names.push(names[first].clone());
                    continue;
                }
                CollisionPolicy::Suffix => {
                    let stem = normalize_prompt(prompt);
                    let renamed = (1..)
                        .map(|n| format!("{}_{}.{}", stem, n, extension))
                        .find(|candidate| !taken.contains_key(&key_for(candidate)))
                        .unwrap_or(file_name);
                    if renamed.len() > MAX_FILE_NAME_BYTES {
                        return Err(AudioGenError::invalid_prompt(
                            prompt,
                            format!("suffixed file name {} is too long", renamed),
                        ));
                    }
                    tracing::debug!(file = %renamed, "renamed colliding output");
                    renamed
                }
            },
        };

        taken.insert(key_for(&name), index);
        names.push(name);
    }

    Ok(names.into_iter().map(|name| output_dir.join(name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_prompt("hello world"), "hello_world");
        assert_eq!(normalize_prompt("foo  bar"), "foo_bar");
        assert_eq!(normalize_prompt("a\t\n b"), "a_b");
        assert_eq!(normalize_prompt(" edges "), "_edges_");
        assert_eq!(normalize_prompt("dog\u{00a0}barking"), "dog_barking");
        assert_eq!(normalize_prompt("nospace"), "nospace");
    }

    #[test]
    fn ascii_separators_count_as_whitespace() {
        assert_eq!(normalize_prompt("dog\u{1f}bark"), "dog_bark");
        assert_eq!(normalize_prompt("a\u{1c}\u{1d} \u{1e}b"), "a_b");
        assert_eq!(normalize_prompt("a\u{1b}b"), "a\u{1b}b");
    }

    #[test]
    fn file_names_get_extension() {
        assert_eq!(file_name_for("hello world", "wav").unwrap(), "hello_world.wav");
        assert_eq!(file_name_for("foo  bar", "wav").unwrap(), "foo_bar.wav");
    }

    #[test]
    fn rejects_unsafe_prompts() {
        for prompt in ["", "a/b", "a\\b", "nul\0", ".", ".."] {
            let err = file_name_for(prompt, "wav").unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidPrompt, "prompt {:?}", prompt);
        }
        let long = "x".repeat(300);
        assert_eq!(
            file_name_for(&long, "wav").unwrap_err().code,
            ErrorCode::InvalidPrompt
        );
    }

    #[test]
    fn plans_paths_in_order() {
        let dir = Path::new("/out");
        let paths =
            plan_output_paths(&["hello world", "foo  bar"], dir, "wav", CollisionPolicy::Fail)
                .unwrap();
        assert_eq!(
            paths,
            vec![dir.join("hello_world.wav"), dir.join("foo_bar.wav")]
        );
    }

    #[test]
    fn empty_prompt_list_is_rejected() {
        let prompts: [&str; 0] = [];
        let err = plan_output_paths(&prompts, Path::new("/out"), "wav", CollisionPolicy::Fail)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrompt);
    }

    #[test]
    fn collision_fails_by_default() {
        let err = plan_output_paths(&["a  b", "a b"], Path::new("/out"), "wav", CollisionPolicy::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NameCollision);
    }

    #[test]
    fn collision_detection_ignores_case() {
        let err = plan_output_paths(&["Rain", "rain"], Path::new("/out"), "wav", CollisionPolicy::Fail)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NameCollision);
    }

    #[test]
    fn suffix_policy_disambiguates() {
        let dir = Path::new("/out");
        let paths = plan_output_paths(
            &["a b", "a  b", "a_b_1", "a\tb"],
            dir,
            "wav",
            CollisionPolicy::Suffix,
        )
        .unwrap();
        assert_eq!(
            paths,
            vec![
                dir.join("a_b.wav"),
                dir.join("a_b_1.wav"),
                dir.join("a_b_1_1.wav"),
                dir.join("a_b_2.wav"),
            ]
        );
    }

    #[test]
    fn overwrite_policy_reuses_path() {
        let dir = Path::new("/out");
        let paths =
            plan_output_paths(&["a  b", "a b"], dir, "wav", CollisionPolicy::Overwrite).unwrap();
        assert_eq!(paths, vec![dir.join("a_b.wav"), dir.join("a_b.wav")]);
    }

    #[test]
    fn overwrite_policy_keeps_case_distinct_names() {
        let dir = Path::new("/out");
        let paths =
            plan_output_paths(&["Rain", "rain"], dir, "wav", CollisionPolicy::Overwrite).unwrap();
        assert_eq!(paths, vec![dir.join("Rain.wav"), dir.join("rain.wav")]);
    }

    #[test]
    fn policy_parsing() {
        assert_eq!(CollisionPolicy::parse("Suffix"), Some(CollisionPolicy::Suffix));
        assert_eq!(CollisionPolicy::parse("overwrite"), Some(CollisionPolicy::Overwrite));
        assert_eq!(CollisionPolicy::parse("rename"), None);
        assert_eq!(CollisionPolicy::Fail.to_string(), "fail");
    }
}
