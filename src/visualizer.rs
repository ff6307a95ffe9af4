use ndarray::Array2;
use plotters::prelude::*;
use std::path::Path;

use crate::solver::{STAT_COULOMB, STAT_VOELLMY};
use crate::terrain::Terrain;

/// Thickness below which a cell is rendered as bare terrain.
const DRAW_CUTOFF: f64 = 1e-3;

/// PNG rendering of thickness and flow-status fields.
pub struct Visualizer {
    width: u32,
    height: u32,
}

impl Visualizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scientific colormap for field visualization.
    pub fn get_sci_color(val: f64, min_val: f64, max_val: f64) -> (u8, u8, u8) {
        let val_clamped = val.max(min_val).min(max_val - 0.0001);
        let d = max_val - min_val;
        let normalized = if d == 0.0 {
            0.5
        } else {
            (val_clamped - min_val) / d
        };

        let m = 0.25;
        let num = (normalized / m).floor() as i32;
        let s = (normalized - (num as f64) * m) / m;

        let (r, g, b) = match num {
            0 => (0.0, s, 1.0),
            1 => (0.0, 1.0, 1.0 - s),
            2 => (s, 1.0, 0.0),
            3 => (1.0, 1.0 - s, 0.0),
            _ => (1.0, 0.0, 0.0),
        };

        ((255.0 * r) as u8, (255.0 * g) as u8, (255.0 * b) as u8)
    }

    /// Grayscale shade for bare terrain from its relative elevation.
    fn bed_shade(terrain: &Terrain, i: usize, j: usize, bed_min: f64, bed_max: f64) -> RGBColor {
        let range = (bed_max - bed_min).max(1e-12);
        let rel = (terrain.bed()[[i, j]] - bed_min) / range;
        let shade = (70.0 + 140.0 * rel) as u8;
        RGBColor(shade, shade, shade)
    }

    /// Save a thickness heatmap over grayscale bed relief.
    pub fn save_thickness_field<P: AsRef<Path>>(
        &self,
        terrain: &Terrain,
        h: &Array2<f64>,
        filename: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (ny, nx) = h.dim();
        let h_max = h.iter().copied().fold(0.0f64, f64::max).max(DRAW_CUTOFF);
        let (bed_min, bed_max) = bed_range(terrain.bed());

        let cell_width = self.width as f64 / nx as f64;
        let cell_height = self.height as f64 / ny as f64;

        for i in 0..ny {
            for j in 0..nx {
                let color = if h[[i, j]] > DRAW_CUTOFF {
                    let (r, g, b) = Self::get_sci_color(h[[i, j]], 0.0, h_max);
                    RGBColor(r, g, b)
                } else {
                    Self::bed_shade(terrain, i, j, bed_min, bed_max)
                };

                let x1 = (j as f64 * cell_width) as i32;
                let y1 = (i as f64 * cell_height) as i32;
                let x2 = ((j + 1) as f64 * cell_width) as i32;
                let y2 = ((i + 1) as f64 * cell_height) as i32;

                root.draw(&Rectangle::new([(x1, y1), (x2, y2)], color.filled()))?;
            }
        }

        root.present()?;
        Ok(())
    }

    /// Save a flow-status map: gray deposit, orange Coulomb cells, red
    /// Voellmy cells over bed relief.
    pub fn save_status_field<P: AsRef<Path>>(
        &self,
        terrain: &Terrain,
        h: &Array2<f64>,
        stat: &Array2<u8>,
        filename: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (ny, nx) = h.dim();
        let (bed_min, bed_max) = bed_range(terrain.bed());

        let cell_width = self.width as f64 / nx as f64;
        let cell_height = self.height as f64 / ny as f64;

        for i in 0..ny {
            for j in 0..nx {
                let color = match stat[[i, j]] {
                    STAT_COULOMB => RGBColor(235, 140, 30),
                    STAT_VOELLMY => RGBColor(210, 35, 35),
                    _ if h[[i, j]] > DRAW_CUTOFF => RGBColor(160, 170, 180),
                    _ => Self::bed_shade(terrain, i, j, bed_min, bed_max),
                };

                let x1 = (j as f64 * cell_width) as i32;
                let y1 = (i as f64 * cell_height) as i32;
                let x2 = ((j + 1) as f64 * cell_width) as i32;
                let y2 = ((i + 1) as f64 * cell_height) as i32;

                root.draw(&Rectangle::new([(x1, y1), (x2, y2)], color.filled()))?;
            }
        }

        root.present()?;
        Ok(())
    }
}

fn bed_range(bed: &Array2<f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in bed.iter() {
        min = min.min(*v);
        max = max.max(*v);
    }
    (min, max)
}
