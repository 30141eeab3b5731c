//! SSD anchor (prior box) generation for the palm detection network.
//!
//! The anchor order must match the row order of the network's flat output: layers in stride
//! order, then feature map rows, then columns, then per-cell anchor variants.

use std::ops::Index;

use crate::config::AnchorConfig;

/// A prior box, normalized to the detector input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub x_center: f32,
    pub y_center: f32,
    pub w: f32,
    pub h: f32,
}

/// The ordered anchor table. Built once and shared read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    pub fn generate(config: &AnchorConfig) -> Self {
        let strides = &config.strides;
        let num_strides = strides.len();
        let mut anchors = Vec::new();

        let mut layer_id = 0;
        while layer_id < num_strides {
            let mut aspect_ratios = Vec::new();
            let mut scales = Vec::new();

            // Consecutive layers sharing a stride are merged into one feature map.
            let mut last_same_stride_layer = layer_id;
            while last_same_stride_layer < num_strides
                && strides[last_same_stride_layer] == strides[layer_id]
            {
                let scale = calculate_scale(
                    config.min_scale,
                    config.max_scale,
                    last_same_stride_layer,
                    num_strides,
                );
                if last_same_stride_layer == 0 && config.reduce_boxes_in_lowest_layer {
                    aspect_ratios.extend([1.0, 2.0, 0.5]);
                    scales.extend([0.1, scale, scale]);
                } else {
                    for &ratio in &config.aspect_ratios {
                        aspect_ratios.push(ratio);
                        scales.push(scale);
                    }
                    if config.interpolated_scale_aspect_ratio > 0.0 {
                        let scale_next = if last_same_stride_layer == num_strides - 1 {
                            1.0
                        } else {
                            calculate_scale(
                                config.min_scale,
                                config.max_scale,
                                last_same_stride_layer + 1,
                                num_strides,
                            )
                        };
                        scales.push((scale * scale_next).sqrt());
                        aspect_ratios.push(config.interpolated_scale_aspect_ratio);
                    }
                }
                last_same_stride_layer += 1;
            }

            let sizes: Vec<(f32, f32)> = aspect_ratios
                .iter()
                .zip(&scales)
                .map(|(&ratio, &scale)| {
                    let ratio_sqrt = ratio.sqrt();
                    (scale * ratio_sqrt, scale / ratio_sqrt)
                })
                .collect();

            let stride = strides[layer_id];
            let feature_map_width = config.input_width.div_ceil(stride);
            let feature_map_height = config.input_height.div_ceil(stride);

            for y in 0..feature_map_height {
                for x in 0..feature_map_width {
                    for &(w, h) in &sizes {
                        let x_center =
                            (x as f32 + config.anchor_offset_x) / feature_map_width as f32;
                        let y_center =
                            (y as f32 + config.anchor_offset_y) / feature_map_height as f32;
                        let (w, h) = if config.fixed_anchor_size {
                            (1.0, 1.0)
                        } else {
                            (w, h)
                        };
                        anchors.push(Anchor {
                            x_center,
                            y_center,
                            w,
                            h,
                        });
                    }
                }
            }

            layer_id = last_same_stride_layer;
        }

        Self { anchors }
    }

    /// Returns the total number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> + '_ {
        self.anchors.iter()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

fn calculate_scale(min_scale: f32, max_scale: f32, stride_index: usize, num_strides: usize) -> f32 {
    if num_strides == 1 {
        return (min_scale + max_scale) * 0.5;
    }
    min_scale + (max_scale - min_scale) * stride_index as f32 / (num_strides as f32 - 1.0)
}
