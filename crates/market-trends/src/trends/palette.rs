use super::share::ShareEntry;
use serde::Serialize;

pub const MIN_PALETTE_SIZE: usize = 10;

const DEFAULT_COLORS: [&str; MIN_PALETTE_SIZE] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("palette needs at least 10 colors, got {0}")]
    TooSmall(usize),
}

/// Fixed, ordered list of chart colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.iter().map(|color| color.to_string()).collect(),
        }
    }
}

impl Palette {
    pub fn new<I, S>(colors: I) -> Result<Self, PaletteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let colors: Vec<String> = colors
            .into_iter()
            .map(Into::into)
            .map(|color: String| color.trim().to_string())
            .filter(|color| !color.is_empty())
            .collect();

        if colors.len() < MIN_PALETTE_SIZE {
            return Err(PaletteError::TooSmall(colors.len()));
        }

        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn slot(&self, index: usize) -> ColorSlot {
        ColorSlot {
            index,
            color: self.colors[index % self.colors.len()].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSlot {
    pub index: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColoredShare {
    #[serde(flatten)]
    pub share: ShareEntry,
    #[serde(flatten)]
    pub slot: ColorSlot,
}

/// Assigns palette colors by sorted position, never by segment identity.
#[derive(Debug, Clone, Copy)]
pub struct ColorCycler<'a> {
    palette: &'a Palette,
}

impl<'a> ColorCycler<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self { palette }
    }

    pub fn assign(&self, shares: &[ShareEntry]) -> Vec<ColoredShare> {
        shares
            .iter()
            .enumerate()
            .map(|(index, share)| ColoredShare {
                share: share.clone(),
                slot: self.palette.slot(index),
            })
            .collect()
    }
}
