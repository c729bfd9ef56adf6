//! Synthetic DVI documents with a matching annotation stream

#![allow(dead_code)]

use rulesort_core::opcode::{
    BOP, DOWN4, EOP, FNT_DEF1, NOP, POST, POST_POST, PRE, PUT_RULE, RIGHT4, SET_RULE,
    TRAILER_PAD, XXX1,
};

/// Source document plus what the annotation pass would have printed for it
#[derive(Debug, Clone)]
pub struct Fixture {
    pub dvi: Vec<u8>,
    pub annotations: String,
    /// Source offsets of every bop
    pub bops: Vec<usize>,
    /// Source offset and length of every line marker
    pub markers: Vec<(usize, usize)>,
}

#[derive(Debug)]
pub struct FixtureBuilder {
    dvi: Vec<u8>,
    lines: Vec<String>,
    bops: Vec<usize>,
    markers: Vec<(usize, usize)>,
    h: i32,
    v: i32,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        let mut dvi = vec![PRE, 2];
        dvi.extend_from_slice(&25_400_000u32.to_be_bytes());
        dvi.extend_from_slice(&473_628_672u32.to_be_bytes());
        dvi.extend_from_slice(&1000u32.to_be_bytes());
        let comment = b" TeX output 2026.10.15:1200";
        dvi.push(comment.len() as u8);
        dvi.extend_from_slice(comment);
        Self {
            dvi,
            lines: Vec::new(),
            bops: Vec::new(),
            markers: Vec::new(),
            h: 0,
            v: 0,
        }
    }

    fn special(&mut self, text: &str) -> usize {
        let at = self.dvi.len();
        self.dvi.push(XXX1);
        self.dvi.push(text.len() as u8);
        self.dvi.extend_from_slice(text.as_bytes());
        at
    }

    pub fn begin_page(&mut self) -> &mut Self {
        let at = self.dvi.len();
        let prev = self.bops.last().map_or(-1, |&b| b as i32);
        self.dvi.push(BOP);
        self.dvi
            .extend_from_slice(&(self.bops.len() as i32 + 1).to_be_bytes());
        self.dvi.extend_from_slice(&[0; 36]);
        self.dvi.extend_from_slice(&prev.to_be_bytes());
        self.lines.push(format!(
            "bop {}: beginning of page {}",
            at,
            self.bops.len() + 1
        ));
        self.bops.push(at);
        self.h = 0;
        self.v = 0;
        self
    }

    pub fn marker(&mut self, kind: char) -> &mut Self {
        let text = if kind == 'b' { " sirule BOL" } else { " sirule EOL" };
        let at = self.special(text);
        self.lines.push(format!("{}ol {}: xxx '{}'", kind, at, text));
        self.markers.push((at, text.len() + 2));
        self
    }

    pub fn right(&mut self, dh: i32) -> &mut Self {
        self.dvi.push(RIGHT4);
        self.dvi.extend_from_slice(&dh.to_be_bytes());
        self.h += dh;
        self
    }

    pub fn down(&mut self, dv: i32) -> &mut Self {
        self.dvi.push(DOWN4);
        self.dvi.extend_from_slice(&dv.to_be_bytes());
        self.v += dv;
        self
    }

    pub fn move_to(&mut self, h: i32, v: i32) -> &mut Self {
        let (dh, dv) = (h - self.h, v - self.v);
        self.right(dh).down(dv)
    }

    /// Text that is neither a rule nor a marker
    pub fn noise(&mut self) -> &mut Self {
        self.special("papersize=210mm,297mm");
        self.dvi.push(NOP);
        self
    }

    /// A set_rule wrapped in `color push <color>` / `color pop`
    pub fn rule(&mut self, color: &str, height: i32, width: i32) -> &mut Self {
        let color_at = self.special(&format!("color push {}", color));
        let rule_at = self.dvi.len();
        self.dvi.push(SET_RULE);
        self.dvi.extend_from_slice(&height.to_be_bytes());
        self.dvi.extend_from_slice(&width.to_be_bytes());
        self.lines.push(format!(
            "h={} v={} {}:color_push_{} {}: setrule height {}, width {} (1x1 pixels)",
            self.h,
            self.v,
            color_at,
            color.replace(' ', "_"),
            rule_at,
            height as u32,
            width as u32
        ));
        self.h += width;
        self.special("color pop");
        self
    }

    /// A put_rule without a color special of its own
    pub fn plain_rule(&mut self, height: i32, width: i32) -> &mut Self {
        let rule_at = self.dvi.len();
        self.dvi.push(PUT_RULE);
        self.dvi.extend_from_slice(&height.to_be_bytes());
        self.dvi.extend_from_slice(&width.to_be_bytes());
        self.lines.push(format!(
            "h={} v={} 0:pdf:bcolor [0] {}: putrule height {}, width {} (1x1 pixels)",
            self.h, self.v, rule_at, height as u32, width as u32
        ));
        self
    }

    pub fn end_page(&mut self) -> &mut Self {
        let at = self.dvi.len();
        self.dvi.push(EOP);
        self.lines
            .push(format!("{}: eop  h={} v={}", at, self.h, self.v));
        self
    }

    pub fn finish(&mut self) -> Fixture {
        let mut dvi = self.dvi.clone();
        let post = dvi.len() as i32;
        let last_bop = self.bops.last().map_or(-1, |&b| b as i32);
        dvi.push(POST);
        dvi.extend_from_slice(&last_bop.to_be_bytes());
        for field in [25_400_000u32, 473_628_672, 1000, 43_725_786, 30_785_863] {
            dvi.extend_from_slice(&field.to_be_bytes());
        }
        dvi.extend_from_slice(&1u16.to_be_bytes());
        dvi.extend_from_slice(&(self.bops.len() as u16).to_be_bytes());
        for (k, name) in [(0u8, "cmr10"), (1, "cmbx12")] {
            dvi.extend_from_slice(&[FNT_DEF1, k]);
            dvi.extend_from_slice(&[0x4b, 0xf1, 0x6e, 0x79]);
            dvi.extend_from_slice(&655_360u32.to_be_bytes());
            dvi.extend_from_slice(&655_360u32.to_be_bytes());
            dvi.extend_from_slice(&[0, name.len() as u8]);
            dvi.extend_from_slice(name.as_bytes());
        }
        dvi.push(POST_POST);
        dvi.extend_from_slice(&post.to_be_bytes());
        dvi.push(2);
        dvi.extend_from_slice(&[TRAILER_PAD; 6]);

        let mut annotations = self.lines.join("\n");
        annotations.push('\n');
        Fixture {
            dvi,
            annotations,
            bops: self.bops.clone(),
            markers: self.markers.clone(),
        }
    }
}

/// The two-rule page used throughout the tests
pub fn red_blue_page() -> Fixture {
    FixtureBuilder::new()
        .begin_page()
        .move_to(10, 20)
        .rule("red", 100, 50)
        .move_to(30, 5)
        .rule("blue", 20, 200)
        .move_to(40, 60)
        .end_page()
        .finish()
}
