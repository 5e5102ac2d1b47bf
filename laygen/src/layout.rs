//! Layout geometry accumulated by a template and emitted to renderers.

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uniquify::Names;

use crate::grid::Via;
use crate::params::{Params, TemplateKey};

/// A (possibly arrayed) rectangle on one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// The layer name.
    pub layer: ArcStr,
    /// The rectangles.
    pub array: BoxArray,
}

impl Transform for Shape {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer.clone(),
            array: self.array.transform(trans),
        }
    }
}

/// A fixed-width path through a list of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// The layer name.
    pub layer: ArcStr,
    /// The path width.
    pub width: i64,
    /// The points along the path.
    pub points: Vec<Point>,
}

impl Transform for Path {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer.clone(),
            width: self.width,
            points: self.points.transform(trans),
        }
    }
}

/// A pin label, optionally backed by a pin rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// The net the pin belongs to.
    pub net: ArcStr,
    /// The text of the label.
    pub label: ArcStr,
    /// The layer name.
    pub layer: ArcStr,
    /// The layer purpose of the pin.
    pub purpose: ArcStr,
    /// The pin area.
    pub rect: Rect,
    /// Whether a pin rectangle is drawn in addition to the label.
    pub make_rect: bool,
}

impl Transform for Pin {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            rect: self.rect.transform(trans),
            ..self.clone()
        }
    }
}

/// Where and how an instance is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Location of the instance origin in the parent.
    pub loc: Point,
    /// Orientation of the instance.
    pub orient: Orientation,
    /// Number of columns.
    pub nx: u32,
    /// Number of rows.
    pub ny: u32,
    /// Column pitch.
    pub spx: i64,
    /// Row pitch.
    pub spy: i64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            loc: Point::zero(),
            orient: Orientation::R0,
            nx: 1,
            ny: 1,
            spx: 0,
            spy: 0,
        }
    }
}

impl Placement {
    /// The transformation of the array element in column `col` and row `row`.
    pub fn transformation(&self, col: u32, row: u32) -> Transformation {
        let offset = self.loc.translate(col as i64 * self.spx, row as i64 * self.spy);
        Transformation::from_offset_and_orientation(offset, self.orient)
    }

    /// The transformations of every array element, column-major.
    pub fn transformations(&self) -> impl Iterator<Item = Transformation> + '_ {
        (0..self.nx).flat_map(move |col| (0..self.ny).map(move |row| self.transformation(col, row)))
    }
}

/// What an instance refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstanceMaster {
    /// Another template, by its identity key in the database.
    Template(TemplateKey),
    /// An externally provided cell.
    Primitive {
        /// Library name.
        lib: ArcStr,
        /// Cell name.
        cell: ArcStr,
        /// View name.
        view: ArcStr,
        /// Parameters, for parametrized cells.
        params: Option<Params>,
    },
}

/// A placed instance inside a template layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceElem {
    /// The instance name, unique within the parent.
    pub name: ArcStr,
    /// The instantiated cell.
    pub master: InstanceMaster,
    /// The placement of the instance.
    pub placement: Placement,
}

/// The geometry of one template.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    rects: Vec<Shape>,
    vias: Vec<Via>,
    paths: Vec<Path>,
    pins: Vec<Pin>,
    instances: Vec<InstanceElem>,
    inst_names: Names<usize>,
}

impl Layout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_rect(&mut self, shape: Shape) {
        self.rects.push(shape);
    }

    pub(crate) fn add_via(&mut self, via: Via) {
        self.vias.push(via);
    }

    pub(crate) fn add_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub(crate) fn add_pin(&mut self, pin: Pin) {
        self.pins.push(pin);
    }

    /// Adds an instance and returns its unique name.
    ///
    /// Unnamed instances are called `X0`, `X1`, and so on.
    pub(crate) fn add_instance(
        &mut self,
        name: Option<&str>,
        master: InstanceMaster,
        placement: Placement,
    ) -> ArcStr {
        let id = self.instances.len();
        let base = match name {
            Some(name) => ArcStr::from(name),
            None => arcstr::format!("X{id}"),
        };
        let name = self.inst_names.assign_name(id, &base);
        self.instances.push(InstanceElem {
            name: name.clone(),
            master,
            placement,
        });
        name
    }

    /// Moves every shape, via, path, primitive pin and instance by `(dx, dy)`.
    pub(crate) fn move_all_by(&mut self, dx: i64, dy: i64) {
        for shape in self.rects.iter_mut() {
            shape.array = shape.array.translate(dx, dy);
        }
        for via in self.vias.iter_mut() {
            *via = via.clone().translate(dx, dy);
        }
        for path in self.paths.iter_mut() {
            for p in path.points.iter_mut() {
                *p = p.translate(dx, dy);
            }
        }
        for pin in self.pins.iter_mut() {
            pin.rect = pin.rect.translate(dx, dy);
        }
        for inst in self.instances.iter_mut() {
            inst.placement.loc = inst.placement.loc.translate(dx, dy);
        }
    }

    /// The rectangles.
    pub fn rects(&self) -> &[Shape] {
        &self.rects
    }

    /// The vias.
    pub fn vias(&self) -> &[Via] {
        &self.vias
    }

    /// The paths.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// The pins.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The instances, in insertion order.
    pub fn instances(&self) -> &[InstanceElem] {
        &self.instances
    }

    /// The keys of every instantiated template, in first-use order.
    pub fn children(&self) -> IndexSet<TemplateKey> {
        self.instances
            .iter()
            .filter_map(|inst| match &inst.master {
                InstanceMaster::Template(key) => Some(key.clone()),
                InstanceMaster::Primitive { .. } => None,
            })
            .collect()
    }

    /// Returns `true` if nothing has been drawn.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
            && self.vias.is_empty()
            && self.paths.is_empty()
            && self.pins.is_empty()
            && self.instances.is_empty()
    }
}

/// A cell reference in emitted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Instance name.
    pub name: ArcStr,
    /// Library of the referenced cell.
    pub lib: ArcStr,
    /// Name of the referenced cell.
    pub cell: ArcStr,
    /// View of the referenced cell.
    pub view: ArcStr,
    /// Placement of the reference.
    pub placement: Placement,
    /// Parameters of a parametrized primitive.
    pub params: Option<Params>,
}

/// The content of one emitted cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellContent {
    /// Cell name.
    pub name: ArcStr,
    /// Rectangles.
    pub rects: Vec<Shape>,
    /// Vias.
    pub vias: Vec<Via>,
    /// Paths.
    pub paths: Vec<Path>,
    /// Pins.
    pub pins: Vec<Pin>,
    /// Cell references.
    pub instances: Vec<InstanceRef>,
}

impl CellContent {
    /// Creates an empty cell called `name`.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends the geometry of `layout`, moved by `trans`.
    ///
    /// Instances are not copied.
    pub(crate) fn extend_geometry(&mut self, layout: &Layout, trans: Transformation, pins: bool) {
        self.rects
            .extend(layout.rects().iter().map(|s| s.transform(trans)));
        self.vias.extend(layout.vias().iter().map(|v| v.transform(trans)));
        self.paths
            .extend(layout.paths().iter().map(|p| p.transform(trans)));
        if pins {
            self.pins.extend(layout.pins().iter().map(|p| p.transform(trans)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[crate::test]
    fn instance_names_are_unique() {
        let mut layout = Layout::new();
        let prim = || InstanceMaster::Primitive {
            lib: "lib".into(),
            cell: "cell".into(),
            view: "layout".into(),
            params: None,
        };
        assert_eq!(layout.add_instance(None, prim(), Placement::default()), "X0");
        assert_eq!(layout.add_instance(Some("X0"), prim(), Placement::default()), "X0_1");
        assert_eq!(layout.add_instance(Some("MN"), prim(), Placement::default()), "MN");
        assert_eq!(layout.add_instance(None, prim(), Placement::default()), "X3");
        assert!(layout.children().is_empty());
    }

    #[crate::test]
    fn move_all_by_shifts_everything() {
        let mut layout = Layout::new();
        layout.add_rect(Shape {
            layer: "M1".into(),
            array: Rect::from_sides(0, 0, 10, 10).into(),
        });
        layout.add_path(Path {
            layer: "M2".into(),
            width: 4,
            points: vec![Point::new(0, 0), Point::new(0, 20)],
        });
        layout.add_instance(None, InstanceMaster::Primitive {
            lib: "lib".into(),
            cell: "cell".into(),
            view: "layout".into(),
            params: None,
        }, Placement::default());
        layout.move_all_by(5, -5);
        assert_eq!(layout.rects()[0].array.base(), Rect::from_sides(5, -5, 15, 5));
        assert_eq!(layout.paths()[0].points[1], Point::new(5, 15));
        assert_eq!(layout.instances()[0].placement.loc, Point::new(5, -5));
    }

    #[crate::test]
    fn placement_enumerates_array_elements() {
        let placement = Placement {
            loc: Point::new(10, 0),
            nx: 2,
            ny: 2,
            spx: 100,
            spy: 50,
            ..Default::default()
        };
        let offsets: Vec<_> = placement
            .transformations()
            .map(|t| t.offset_point())
            .collect();
        assert_eq!(
            offsets,
            vec![
                Point::new(10, 0),
                Point::new(10, 50),
                Point::new(110, 0),
                Point::new(110, 50)
            ]
        );
    }
}
