use image::{ImageBuffer, Rgb, RgbImage};

use crate::grid::Grid;
use crate::simulation::FieldView;

#[inline]
pub fn density_color(a: f32, b: f32) -> [u8; 3] {
    let a = a.clamp(0.0, 1.0);
    let b = b.clamp(0.0, 1.0);
    let g = a.min(b);
    [to_byte(a), to_byte(g), to_byte(b)]
}

#[inline]
fn to_byte(value: f32) -> u8 {
    (value * 255.0) as u8
}

pub struct Renderer {
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn render_density(&self, view: &FieldView<'_>) -> RgbImage {
        let n = view.sim_size();
        let mut img = ImageBuffer::new(self.width, self.height);

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let sim_x = self.sample(x, self.width, n);
            let sim_y = self.sample(y, self.height, n);
            *pixel = Rgb(density_color(view.a(sim_x, sim_y), view.b(sim_x, sim_y)));
        }

        img
    }

    pub fn render_velocity(&self, grid: Grid, velocity: &[f32], scale: f32) -> RgbImage {
        let view = FieldView::new(grid, velocity);
        let n = grid.sim_size;
        let mut img = ImageBuffer::new(self.width, self.height);

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let sim_x = self.sample(x, self.width, n);
            let sim_y = self.sample(y, self.height, n);
            let u = (view.get(sim_x, sim_y, 0).abs() * scale).min(1.0);
            let v = (view.get(sim_x, sim_y, 1).abs() * scale).min(1.0);
            *pixel = Rgb([to_byte(u), to_byte(v), 128]);
        }

        img
    }

    // Padded interior coordinate for output pixel `p`.
    fn sample(&self, p: u32, extent: u32, n: usize) -> usize {
        let cell = (p as f32 / extent as f32 * n as f32) as usize;
        cell.min(n - 1) + 1
    }
}

pub fn to_color_image(view: &FieldView<'_>) -> egui::ColorImage {
    let n = view.sim_size();
    let mut pixels = Vec::with_capacity(n * n);
    for y in 1..=n {
        for x in 1..=n {
            let [r, g, b] = density_color(view.a(x, y), view.b(x, y));
            pixels.push(egui::Color32::from_rgb(r, g, b));
        }
    }
    egui::ColorImage {
        size: [n, n],
        pixels,
    }
}
