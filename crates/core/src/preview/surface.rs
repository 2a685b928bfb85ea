/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Color from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Background of every frame.
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Instruction text and fresh canvases.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    /// Player square.
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    /// Title text.
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge; may be negative.
    pub x: i32,
    /// Top edge; may be negative.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Rectangle with its top-left corner at `(x, y)`.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Text drawn onto a surface, kept as a label rather than rasterized glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLabel {
    /// Text as drawn.
    pub text: String,
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Text color.
    pub color: Rgb,
}

/// 2D raster target supplied by the host UI.
pub trait Surface {
    /// Fixed size in pixels.
    fn size(&self) -> (u32, u32);

    /// Whether the surface can currently be drawn to.
    fn is_available(&self) -> bool {
        let (width, height) = self.size();
        width > 0 && height > 0
    }

    /// Fill the whole surface.
    fn clear(&mut self, color: Rgb);

    /// Fill a rectangle, clipped to the surface.
    fn fill_rect(&mut self, rect: PixelRect, color: Rgb);

    /// Draw a line of text with its top-left corner at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: i32, y: i32, color: Rgb);

    /// Called once a frame is complete.
    fn present(&mut self, _frame: u32) {}
}

/// In-memory RGB surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
    labels: Vec<TextLabel>,
    attached: bool,
    mutations: u64,
    presented: u32,
}

impl Canvas {
    /// Black canvas of the given size, ready to draw on.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; len],
            labels: Vec::new(),
            attached: true,
            mutations: 0,
            presented: 0,
        }
    }

    /// A canvas whose host element is gone; it refuses to start a preview.
    pub fn detached(width: u32, height: u32) -> Self {
        Self {
            attached: false,
            ..Self::new(width, height)
        }
    }

    /// Color at `(x, y)`, `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Text drawn since the last clear.
    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Count of drawing calls applied so far.
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Number of the last presented frame.
    pub fn presented(&self) -> u32 {
        self.presented
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_available(&self) -> bool {
        self.attached && self.width > 0 && self.height > 0
    }

    fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
        self.labels.clear();
        self.mutations += 1;
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgb) {
        let x0 = rect.x.clamp(0, self.width as i32) as usize;
        let y0 = rect.y.clamp(0, self.height as i32) as usize;
        let x1 = (rect.x + rect.width as i32).clamp(0, self.width as i32) as usize;
        let y1 = (rect.y + rect.height as i32).clamp(0, self.height as i32) as usize;
        let stride = self.width as usize;
        for row in y0..y1 {
            self.pixels[row * stride + x0..row * stride + x1].fill(color);
        }
        self.mutations += 1;
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, color: Rgb) {
        self.labels.push(TextLabel {
            text: text.to_string(),
            x,
            y,
            color,
        });
        self.mutations += 1;
    }

    fn present(&mut self, frame: u32) {
        self.presented = frame;
    }
}
