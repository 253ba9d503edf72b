//! Prompts sent to the inference service.
//!
//! The recognition rules are a compatibility contract with the model's
//! output format and must stay word-for-word.

/// Instructional prompt sent alongside the equation image.
pub const RECOGNITION_PROMPT: &str = concat!(
    "Please read the mathematical equation in the image and output the LaTeX code. ",
    "IMPORTANT INSTRUCTIONS: ",
    "- DO NOT include any other text or explanations ",
    "- DO NOT include $ symbols around the equation ",
    "- For vector notation, carefully identify which symbols represent vectors: ",
    r"* Use \mathbf{} for bold vectors (like \mathbf{v}, \mathbf{b}, \mathbf{x}, \mathbf{y}, etc.) ",
    r"* Use \bm{} for bold mathematical symbols that are vectors ",
    "* Pay special attention to subscripts and superscripts on vectors ",
    "* Common vector symbols include: v, u, w, b, x, y, z, a, c, d, e, f, g, h, i, j, k, l, m, n, o, p, q, r, s, t ",
    r"- Use \mathbb{} for special number sets (like \mathbb{R}, \mathbb{Z}, \mathbb{N}, \mathbb{C}) ",
    r"- Use \mathcal{} for calligraphic letters (like \mathcal{L}, \mathcal{M}, \mathcal{N}) ",
    "- Use align* environment for multi-line equations ",
    "- Preserve all mathematical notation exactly as shown in the image",
);

/// Prompt asking for a 3-4 sentence explanation of `markup`.
pub fn explanation_prompt(language: &str, markup: &str) -> String {
    format!(
        "Please explain the following LaTeX equation in {}: by 3-4 sentences. \
         Please write the equations in the explanation using TeX format. {}",
        language, markup
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_prompt_rules() {
        assert!(RECOGNITION_PROMPT.contains(r"Use \mathbf{} for bold vectors"));
        assert!(RECOGNITION_PROMPT.contains(r"Use \bm{} for bold mathematical symbols"));
        assert!(RECOGNITION_PROMPT.contains(r"Use \mathbb{} for special number sets"));
        assert!(RECOGNITION_PROMPT.contains(r"Use \mathcal{} for calligraphic letters"));
        assert!(RECOGNITION_PROMPT.contains("Use align* environment"));
        assert!(RECOGNITION_PROMPT.contains("DO NOT include $ symbols"));
        assert!(!RECOGNITION_PROMPT.contains('\n'));
    }

    #[test]
    fn test_explanation_prompt() {
        let prompt = explanation_prompt("English", "E=mc^2");
        assert!(prompt.starts_with("Please explain the following LaTeX equation in English: by 3-4 sentences."));
        assert!(prompt.ends_with("using TeX format. E=mc^2"));
    }
}
