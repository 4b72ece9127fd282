use crate::frames::CoordFrame;
use crate::reproject::{HeaderCard, HeaderValue, ImageParams};
use crate::volume::{VolumeGeometry, DEFAULT_CELL_SIZE, DEFAULT_SIDE};
use crate::wcs::{DEFAULT_IMAGE_SIZE, DEFAULT_PIXEL_SCALE_DEG};
use crate::Result;
use clap::Parser;

/// Parse a header card in format "KEY=VALUE" or "KEY=VALUE/comment"
pub fn parse_header_card(s: &str) -> std::result::Result<HeaderCard, String> {
    let (key, rest) = s
        .split_once('=')
        .ok_or_else(|| "Header card must be in format 'KEY=VALUE[/comment]'".to_string())?;
    let key = key.trim();
    if key.is_empty() || key.len() > 8 {
        return Err(format!("Header key '{key}' must be 1 to 8 characters"));
    }

    let (value, comment) = match rest.split_once('/') {
        Some((value, comment)) => (value.trim(), Some(comment.trim())),
        None => (rest.trim(), None),
    };
    let value = if let Ok(v) = value.parse::<i64>() {
        HeaderValue::Int(v)
    } else if let Ok(v) = value.parse::<f64>() {
        HeaderValue::Float(v)
    } else {
        HeaderValue::Str(value.trim_matches('\'').to_string())
    };

    let card = HeaderCard::new(key.to_ascii_uppercase(), value);
    Ok(match comment {
        Some(c) if !c.is_empty() => card.with_comment(c),
        _ => card,
    })
}

/// Simulation box arguments shared by the volume-reading binaries
#[derive(Parser, Debug, Clone)]
pub struct VolumeArgs {
    /// Cells along each axis of the simulation box
    #[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"],
          default_values_t = [DEFAULT_SIDE, DEFAULT_SIDE, DEFAULT_SIDE])]
    pub sim_size: Vec<usize>,

    /// Comoving cell size in Mpc/h
    #[arg(long, default_value_t = DEFAULT_CELL_SIZE)]
    pub sim_res: f64,
}

impl VolumeArgs {
    pub fn geometry(&self) -> Result<VolumeGeometry> {
        VolumeGeometry::from_extents(&self.sim_size, self.sim_res)
    }
}

/// Output image arguments for the reprojection binaries
#[derive(Parser, Debug, Clone)]
pub struct ImageArgs {
    /// Square image side in pixels
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
    pub size: usize,

    /// Pixel scale in degrees
    #[arg(long, default_value_t = DEFAULT_PIXEL_SCALE_DEG)]
    pub res: f64,

    /// Uniform factor applied to the map before sampling
    #[arg(long, default_value_t = 1.0)]
    pub multiplier: f64,

    /// Frame of the input map (C, E or G), overriding its COORDSYS card
    #[arg(long)]
    pub frame: Option<CoordFrame>,

    /// Extra header card, repeatable (format: "KEY=VALUE[/comment]")
    #[arg(long = "card", value_parser = parse_header_card)]
    pub cards: Vec<HeaderCard>,
}

impl ImageArgs {
    pub fn params(&self) -> ImageParams {
        ImageParams {
            size: self.size,
            res_deg: self.res,
            multiplier: self.multiplier,
            extra_cards: self.cards.clone(),
            map_frame: self.frame,
            ..ImageParams::default()
        }
    }
}
