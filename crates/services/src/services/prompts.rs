//! Instructions sent to the image model for each synthesized angle.

use db::models::gallery_image::Angle;

const PHOTO_STYLE: &str =
    "Professional product photography, studio lighting, white background, high quality.";

/// Edit instruction asking the model to re-render the supplied photo from
/// `angle`. `None` for the front angle, which is never generated.
pub fn edit_instruction(category: &str, angle: Angle) -> Option<String> {
    let category = category.trim().to_lowercase();
    let instruction = match angle {
        Angle::Front => return None,
        Angle::Side => format!(
            "Show this exact same {category} product from a side angle view. \
             Keep the exact same design, colors, materials, and style. {PHOTO_STYLE}"
        ),
        Angle::Back => format!(
            "Show this exact same {category} product from the back/rear view. \
             Maintain the exact same design, colors, materials, and style. {PHOTO_STYLE}"
        ),
        Angle::Detail => format!(
            "Show a close-up detail shot of this exact same {category} product, \
             focusing on the texture, materials, and craftsmanship. \
             Keep the same design and colors. {PHOTO_STYLE}"
        ),
    };
    Some(instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_category() {
        let side = edit_instruction("Shoes", Angle::Side).unwrap();
        assert!(side.starts_with("Show this exact same shoes product from a side angle view."));
        assert!(side.ends_with("white background, high quality."));
    }

    #[test]
    fn each_generatable_angle_has_its_own_instruction() {
        let back = edit_instruction("Tops", Angle::Back).unwrap();
        let detail = edit_instruction("Tops", Angle::Detail).unwrap();
        assert!(back.contains("back/rear view"));
        assert!(detail.contains("close-up detail shot of this exact same tops product"));
        assert!(edit_instruction("Tops", Angle::Front).is_none());
    }
}
