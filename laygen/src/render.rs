//! Renderers that persist generated cells.

use std::io::Write;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::CellContent;

/// Writes a batch of cells to a layout library.
///
/// Cells arrive in dependency order: every cell appears after all the cells
/// it references.
pub trait Renderer {
    /// Writes `cells` into the library `lib_name`.
    fn render(&mut self, lib_name: &str, cells: &[CellContent]) -> Result<()>;
}

/// A rendered library, as written by both renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// The library name.
    pub lib_name: ArcStr,
    /// The cells, in dependency order.
    pub cells: Vec<CellContent>,
}

#[derive(Serialize)]
struct LibraryRef<'a> {
    lib_name: &'a str,
    cells: &'a [CellContent],
}

/// Writes each batch as a pretty-printed JSON document.
#[derive(Debug)]
pub struct GenericRenderer<W> {
    writer: W,
}

impl<W: Write> GenericRenderer<W> {
    /// Creates a renderer writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for GenericRenderer<W> {
    fn render(&mut self, lib_name: &str, cells: &[CellContent]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &LibraryRef { lib_name, cells })?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each batch as a flexbuffers blob.
#[derive(Debug)]
pub struct NativeRenderer<W> {
    writer: W,
}

impl<W: Write> NativeRenderer<W> {
    /// Creates a renderer writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Renderer for NativeRenderer<W> {
    fn render(&mut self, lib_name: &str, cells: &[CellContent]) -> Result<()> {
        let data = flexbuffers::to_vec(LibraryRef { lib_name, cells })?;
        self.writer.write_all(&data)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geometry::prelude::*;

    use super::*;
    use crate::layout::Shape;

    fn cells() -> Vec<CellContent> {
        let mut cell = CellContent::new("inv");
        cell.rects.push(Shape {
            layer: "M1".into(),
            array: BoxArray::new(Rect::from_sides(0, 0, 10, 20), 2, 1, 30, 0),
        });
        vec![cell]
    }

    #[crate::test]
    fn generic_renderer_writes_json() {
        let mut renderer = GenericRenderer::new(Vec::new());
        renderer.render("lib", &cells()).unwrap();
        let lib: Library = serde_json::from_slice(&renderer.into_inner()).unwrap();
        assert_eq!(lib.lib_name, "lib");
        assert_eq!(lib.cells[0].name, "inv");
        assert_eq!(lib.cells[0].rects[0].array.nx(), 2);
    }

    #[crate::test]
    fn native_renderer_writes_flexbuffers() {
        let mut renderer = NativeRenderer::new(Vec::new());
        renderer.render("lib", &cells()).unwrap();
        let data = renderer.into_inner();
        let lib: Library = flexbuffers::from_slice(&data).unwrap();
        assert_eq!(lib.cells.len(), 1);
        assert_eq!(lib.cells[0].rects[0].layer, "M1");
    }
}
