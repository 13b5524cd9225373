use dioxus::prelude::*;
use nosmoke_core::stream::Overlay;

// ─── DetectionOverlay ──────────────────────────────────────────
// SVG layer over the live frame. The viewBox uses frame pixels, so the
// boxes scale with the image.

#[component]
pub fn DetectionOverlay(overlay: Overlay, frame_width: u32, frame_height: u32) -> Element {
    if overlay.is_empty() || frame_width == 0 || frame_height == 0 {
        return rsx! {};
    }
    // Keep labels legible on large frames.
    let font_size = (f64::from(frame_width) / 40.0).max(12.0);
    let label_height = font_size * 1.4;

    rsx! {
        svg {
            class: "detection-svg",
            view_box: "0 0 {frame_width} {frame_height}",
            preserve_aspect_ratio: "xMidYMid meet",

            for (idx, b) in overlay.boxes.iter().enumerate() {
                {
                    let label_y = if b.y >= label_height { b.y - label_height } else { b.y };
                    let label_width = b.label.chars().count() as f64 * font_size * 0.62 + 8.0;
                    let text_y = label_y + font_size * 1.05;
                    let text_x = b.x + 4.0;

                    rsx! {
                        g { key: "{idx}",
                            rect {
                                x: "{b.x}",
                                y: "{b.y}",
                                width: "{b.width}",
                                height: "{b.height}",
                                fill: "none",
                                stroke: "{b.colour}",
                                stroke_width: "3",
                            }
                            rect {
                                x: "{b.x}",
                                y: "{label_y}",
                                width: "{label_width}",
                                height: "{label_height}",
                                fill: "{b.colour}",
                            }
                            text {
                                x: "{text_x}",
                                y: "{text_y}",
                                fill: "#ffffff",
                                font_size: "{font_size}",
                                font_weight: "600",
                                "{b.label}"
                            }
                        }
                    }
                }
            }
        }
    }
}
