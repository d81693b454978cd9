//! Cache of shader-ready colors keyed by protocol color.

use std::collections::HashMap;

use crate::color::Rgb;

#[derive(Debug, Default)]
pub(crate) struct BrushCache {
    /// Target stores linear values and re-encodes on write.
    linear: bool,
    brushes: HashMap<Rgb, [f32; 4]>,
}

impl BrushCache {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self {
            linear: format.is_srgb(),
            brushes: HashMap::new(),
        }
    }

    pub fn get(&mut self, color: Rgb) -> [f32; 4] {
        let linear = self.linear;
        *self.brushes.entry(color).or_insert_with(|| {
            let rgba = color.to_f32_rgba();
            if linear {
                [
                    srgb_to_linear(rgba[0]),
                    srgb_to_linear(rgba[1]),
                    srgb_to_linear(rgba[2]),
                    rgba[3],
                ]
            } else {
                rgba
            }
        })
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unorm_targets_take_colors_as_is() {
        let mut brushes = BrushCache::new(wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(brushes.get(Rgb(0xff0000)), [1.0, 0.0, 0.0, 1.0]);
        brushes.get(Rgb(0xff0000));
        assert_eq!(brushes.len(), 1);
    }

    #[test]
    fn srgb_targets_get_linear_values() {
        let mut brushes = BrushCache::new(wgpu::TextureFormat::Bgra8UnormSrgb);
        let [r, g, _, a] = brushes.get(Rgb(0x80ff00));
        assert!((r - 0.2158).abs() < 1e-3);
        assert_eq!(g, 1.0);
        assert_eq!(a, 1.0);
    }
}
