//! HTML gallery rendering.

use serde::Serialize;

use webcam_core::{ImageKey, StoredImage};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// One image as presented by the gallery and the JSON listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    pub key: ImageKey,
    pub file_name: String,
    pub thumbnail_name: String,
    pub size: u64,
    /// Local capture time, `YYYY-MM-DD HH:MM:SS`.
    pub formatted_time: String,
    /// Local capture day, `YYYY-MM-DD`.
    pub day: String,
}

impl From<&StoredImage> for GalleryItem {
    fn from(image: &StoredImage) -> Self {
        let captured_at = image.captured_at();
        Self {
            key: image.key,
            file_name: image.file_name(),
            thumbnail_name: image.thumbnail_name(),
            size: image.size,
            formatted_time: captured_at.format(TIME_FORMAT).to_string(),
            day: captured_at.format(DAY_FORMAT).to_string(),
        }
    }
}

/// Render the gallery page.
///
/// `items` are expected newest first; consecutive items of the same day are
/// grouped under one heading.
pub fn render(items: &[GalleryItem], is_daytime: bool) -> String {
    let mut html = String::with_capacity(1024 + items.len() * 256);

    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Webcam Archive</title>\n\
         <style>\n\
         body { font-family: sans-serif; margin: 1.5rem; background: #f4f4f4; }\n\
         .status { margin-bottom: 1rem; }\n\
         .day { display: flex; flex-wrap: wrap; gap: 0.75rem; }\n\
         figure { margin: 0; background: #fff; padding: 0.4rem; }\n\
         figcaption { font-size: 0.85rem; text-align: center; }\n\
         img { display: block; max-width: 400px; }\n\
         </style>\n</head>\n<body>\n<h1>Webcam Archive</h1>\n",
    );

    let (class, label) = if is_daytime {
        ("daytime", "It is daytime at the camera.")
    } else {
        ("nighttime", "It is nighttime at the camera.")
    };
    html.push_str(&format!("<p class=\"status {class}\">{label}</p>\n"));

    if items.is_empty() {
        html.push_str("<p>No images yet.</p>\n");
    }

    let mut current_day: Option<&str> = None;
    for item in items {
        if current_day != Some(item.day.as_str()) {
            if current_day.is_some() {
                html.push_str("</div>\n</section>\n");
            }
            html.push_str(&format!(
                "<section>\n<h2>{}</h2>\n<div class=\"day\">\n",
                item.day
            ));
            current_day = Some(item.day.as_str());
        }

        html.push_str(&format!(
            "<figure><a href=\"/images/{file}\"><img src=\"/thumbnails/{thumb}\" alt=\"{time}\" loading=\"lazy\"></a>\
             <figcaption>{time}</figcaption></figure>\n",
            file = item.file_name,
            thumb = item.thumbnail_name,
            time = item.formatted_time,
        ));
    }
    if current_day.is_some() {
        html.push_str("</div>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
