//! The template database.
//!
//! The database memoizes drawn templates by their [`TemplateKey`] and hands
//! out globally unique cell names. Requests for a key that is already drawn
//! are lookups; a request for a key that is being drawn on another thread
//! waits for that draw to finish.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Instant;

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use tracing::{span, Level};
use uniquify::Names;

use crate::config::DbConfig;
use crate::error::{Error, Result};
use crate::grid::RoutingGrid;
use crate::layout::{CellContent, InstanceMaster, InstanceRef, Placement};
use crate::params::{Params, TemplateKey};
use crate::registry::{TemplateId, TemplateRegistry};
use crate::render::Renderer;
use crate::template::{Master, Template, TemplateBuilder};

struct Slot {
    owner: ThreadId,
    cell: OnceCell<Result<Arc<Master>>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            owner: thread::current().id(),
            cell: OnceCell::new(),
        }
    }

    fn wait(&self, key: &TemplateKey) -> Result<Arc<Master>> {
        if let Some(result) = self.cell.get() {
            return result.clone();
        }
        if self.owner == thread::current().id() {
            return Err(Error::CyclicTemplate(key.class().clone()));
        }
        self.cell.wait().clone()
    }
}

#[derive(Default)]
struct DbInner {
    cache: HashMap<TemplateKey, Arc<Slot>>,
    names: Names<TemplateKey>,
}

/// A cache of drawn templates.
///
/// Cloning a database is cheap; clones share the same cache.
#[derive(Clone)]
pub struct TemplateDb {
    inner: Arc<Mutex<DbInner>>,
    config: Arc<DbConfig>,
    grid: Arc<RoutingGrid>,
    registry: Arc<TemplateRegistry>,
}

impl std::fmt::Debug for TemplateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDb")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`TemplateDb`].
#[derive(Debug, Default)]
pub struct TemplateDbBuilder {
    config: DbConfig,
    grid: Option<Arc<RoutingGrid>>,
    registry: TemplateRegistry,
}

impl TemplateDbBuilder {
    /// Creates a builder with the default configuration.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(&mut self, config: DbConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Sets the default routing grid, overriding the grid in the configuration.
    pub fn grid(&mut self, grid: impl Into<Arc<RoutingGrid>>) -> &mut Self {
        self.grid = Some(grid.into());
        self
    }

    /// Registers `template` under `id`.
    pub fn register<T: Template>(&mut self, id: TemplateId, template: T) -> &mut Self {
        self.registry.register(id, template);
        self
    }

    /// Replaces the template registry.
    pub fn registry(&mut self, registry: TemplateRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Builds the database.
    ///
    /// Fails if no routing grid was given and the configuration has none.
    pub fn build(&mut self) -> Result<TemplateDb> {
        let grid = match (&self.grid, &self.config.grid) {
            (Some(grid), _) => grid.clone(),
            (None, Some(grid)) => Arc::new(grid.build()?),
            (None, None) => {
                return Err(Error::InvalidGrid("no routing grid configured".to_string()))
            }
        };
        Ok(TemplateDb {
            inner: Arc::new(Mutex::new(DbInner::default())),
            config: Arc::new(self.config.clone()),
            grid,
            registry: Arc::new(self.registry.clone()),
        })
    }
}

impl TemplateDb {
    /// Creates a [`TemplateDbBuilder`].
    #[inline]
    pub fn builder() -> TemplateDbBuilder {
        TemplateDbBuilder::new()
    }

    /// The configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The default routing grid.
    pub fn grid(&self) -> &Arc<RoutingGrid> {
        &self.grid
    }

    /// The template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Returns `true` if `name` has been given to a generated cell.
    pub fn contains_cell_name(&self, name: &str) -> bool {
        self.inner.lock().unwrap().names.contains(name)
    }

    /// Draws `template` with `params` on the default grid, or returns the
    /// cached master if an identical request was made before.
    pub fn new_template<T: Template>(&self, template: T, params: Params) -> Result<Arc<Master>> {
        self.generate(Arc::new(template), params, self.grid.clone())
    }

    /// Like [`TemplateDb::new_template`], but draws on `grid`.
    pub fn new_template_on_grid<T: Template>(
        &self,
        template: T,
        params: Params,
        grid: impl Into<Arc<RoutingGrid>>,
    ) -> Result<Arc<Master>> {
        self.generate(Arc::new(template), params, grid.into())
    }

    /// Draws the template registered as `id`.
    pub fn new_template_by_id(&self, id: &TemplateId, params: Params) -> Result<Arc<Master>> {
        let template = self.registry.get(id)?;
        self.generate(template, params, self.grid.clone())
    }

    pub(crate) fn generate(
        &self,
        template: Arc<dyn Template>,
        params: Params,
        grid: Arc<RoutingGrid>,
    ) -> Result<Arc<Master>> {
        let params = Params::resolve(&template.params_info(), &template.default_params(), &params)?;
        let key = TemplateKey::new(template.qualified_name(), &params)?;

        let span = span!(
            Level::INFO,
            "generating layout",
            class = %key.class(),
            cell = tracing::field::Empty,
        )
        .or_current();
        let _guard = span.enter();

        let (slot, name) = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(slot) = inner.cache.get(&key).cloned() {
                (slot, None)
            } else {
                let base = format!("{}{}", self.config.name_prefix, template.basename());
                let name = inner.names.assign_name(key.clone(), &base);
                let slot = Arc::new(Slot::new());
                inner.cache.insert(key.clone(), slot.clone());
                (slot, Some(name))
            }
        };
        let Some(name) = name else {
            tracing::debug!("template cache hit");
            return slot.wait(&key);
        };
        span.record("cell", name.as_str());

        let start = Instant::now();
        let result = self.draw(template, key.clone(), name, params, grid);
        match &result {
            Ok(_) => tracing::debug!(elapsed = ?start.elapsed(), "finished drawing template"),
            Err(e) => {
                tracing::debug!(error = %e, "failed to draw template");
                let mut inner = self.inner.lock().unwrap();
                inner.cache.remove(&key);
                inner.names.release(&key);
            }
        }
        if slot.cell.set(result.clone()).is_err() {
            panic!("template slot for {key} was filled twice");
        }
        result
    }

    fn draw(
        &self,
        template: Arc<dyn Template>,
        key: TemplateKey,
        cell_name: ArcStr,
        params: Params,
        grid: Arc<RoutingGrid>,
    ) -> Result<Arc<Master>> {
        let mut builder =
            TemplateBuilder::new(self.clone(), template.clone(), key, cell_name, params, grid);
        template.draw_layout(&mut builder)?;
        Ok(Arc::new(builder.finalize()?))
    }

    /// Returns the finished master with identity `key`.
    pub fn master(&self, key: &TemplateKey) -> Result<Arc<Master>> {
        let inner = self.inner.lock().unwrap();
        inner
            .cache
            .get(key)
            .and_then(|slot| slot.cell.get())
            .and_then(|result| result.as_ref().ok())
            .cloned()
            .ok_or_else(|| Error::UnknownTemplate(key.class().clone()))
    }

    /// Collects the content of `templates` and their dependencies.
    ///
    /// In hierarchical mode every distinct cell is emitted once, after every
    /// cell it references. In flat mode only the given templates are emitted,
    /// each with its whole hierarchy expanded into geometry; primitive
    /// instances are kept as references.
    ///
    /// `names`, if given, renames the top-level cells; `None` entries keep
    /// the generated name. A new name must not collide with a generated cell
    /// name or with another entry.
    pub fn layout_contents(
        &self,
        templates: &[Arc<Master>],
        names: Option<&[Option<ArcStr>]>,
        flatten: bool,
    ) -> Result<Vec<CellContent>> {
        let top_names = self.top_names(templates, names)?;

        if flatten {
            return templates
                .iter()
                .zip(top_names)
                .map(|(master, name)| {
                    tracing::trace!(cell = %name, "flattening cell content");
                    self.flat_content(master, name)
                })
                .collect();
        }

        let mut order = IndexMap::new();
        for (master, name) in templates.iter().zip(top_names) {
            self.collect(master, name, &mut order)?;
        }
        order
            .into_iter()
            .map(|(name, master)| {
                tracing::trace!(cell = %name, "retrieving cell content");
                self.hier_content(&master, name)
            })
            .collect()
    }

    fn top_names(
        &self,
        templates: &[Arc<Master>],
        names: Option<&[Option<ArcStr>]>,
    ) -> Result<Vec<ArcStr>> {
        let Some(names) = names else {
            return Ok(templates.iter().map(|m| m.cell_name().clone()).collect());
        };
        if names.len() != templates.len() {
            return Err(Error::NameListMismatch {
                templates: templates.len(),
                names: names.len(),
            });
        }
        let mut seen = HashSet::new();
        let inner = self.inner.lock().unwrap();
        templates
            .iter()
            .zip(names)
            .map(|(master, name)| match name {
                Some(name) if inner.names.contains(name) || !seen.insert(name.clone()) => {
                    Err(Error::DuplicateCellName(name.clone()))
                }
                Some(name) => Ok(name.clone()),
                None => Ok(master.cell_name().clone()),
            })
            .collect()
    }

    fn collect(
        &self,
        master: &Arc<Master>,
        name: ArcStr,
        order: &mut IndexMap<ArcStr, Arc<Master>>,
    ) -> Result<()> {
        for key in master.children() {
            let child = self.master(key)?;
            if !order.contains_key(child.cell_name()) {
                self.collect(&child, child.cell_name().clone(), order)?;
            }
        }
        order.insert(name, master.clone());
        Ok(())
    }

    fn hier_content(&self, master: &Master, name: ArcStr) -> Result<CellContent> {
        let mut content = CellContent::new(name);
        content.extend_geometry(master.layout(), Transformation::identity(), true);
        for inst in master.layout().instances() {
            let (lib, cell, view, params) = match &inst.master {
                InstanceMaster::Template(key) => (
                    self.config.lib_name.clone(),
                    self.master(key)?.cell_name().clone(),
                    arcstr::literal!("layout"),
                    None,
                ),
                InstanceMaster::Primitive {
                    lib,
                    cell,
                    view,
                    params,
                } => (lib.clone(), cell.clone(), view.clone(), params.clone()),
            };
            content.instances.push(InstanceRef {
                name: inst.name.clone(),
                lib,
                cell,
                view,
                placement: inst.placement,
                params,
            });
        }
        Ok(content)
    }

    fn flat_content(&self, master: &Master, name: ArcStr) -> Result<CellContent> {
        let mut content = CellContent::new(name);
        content.extend_geometry(master.layout(), Transformation::identity(), true);
        let mut inst_names = Names::new();
        self.flatten_into(
            &mut content,
            &mut inst_names,
            master,
            Transformation::identity(),
            "",
        )?;
        Ok(content)
    }

    fn flatten_into(
        &self,
        content: &mut CellContent,
        inst_names: &mut Names<usize>,
        master: &Master,
        trans: Transformation,
        prefix: &str,
    ) -> Result<()> {
        for inst in master.layout().instances() {
            let arrayed = inst.placement.nx * inst.placement.ny > 1;
            for (i, local) in inst.placement.transformations().enumerate() {
                let total = Transformation::cascade(trans, local);
                let path = if arrayed {
                    format!("{prefix}{}_{i}", inst.name)
                } else {
                    format!("{prefix}{}", inst.name)
                };
                match &inst.master {
                    InstanceMaster::Template(key) => {
                        let child = self.master(key)?;
                        content.extend_geometry(child.layout(), total, false);
                        self.flatten_into(content, inst_names, &child, total, &format!("{path}_"))?;
                    }
                    InstanceMaster::Primitive {
                        lib,
                        cell,
                        view,
                        params,
                    } => {
                        let name = inst_names.assign_name(content.instances.len(), &path);
                        content.instances.push(InstanceRef {
                            name,
                            lib: lib.clone(),
                            cell: cell.clone(),
                            view: view.clone(),
                            placement: Placement {
                                loc: total.offset_point(),
                                orient: total.orientation(),
                                ..Default::default()
                            },
                            params: params.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Collects the content of `templates` like [`TemplateDb::layout_contents`]
    /// and writes it with `renderer`.
    pub fn render_with(
        &self,
        renderer: &mut dyn Renderer,
        templates: &[Arc<Master>],
        names: Option<&[Option<ArcStr>]>,
        flatten: bool,
    ) -> Result<Vec<CellContent>> {
        let span = span!(Level::INFO, "batch layout", lib = %self.config.lib_name).or_current();
        let _guard = span.enter();

        let start = Instant::now();
        let cells = self.layout_contents(templates, names, flatten)?;
        tracing::debug!(
            cells = cells.len(),
            elapsed = ?start.elapsed(),
            "collected layout content"
        );

        let start = Instant::now();
        renderer.render(&self.config.lib_name, &cells)?;
        tracing::debug!(elapsed = ?start.elapsed(), "rendered layout");
        Ok(cells)
    }

    /// Writes `templates` and their dependencies to `writer` using the
    /// configured backend.
    pub fn batch_layout<W: Write>(
        &self,
        writer: W,
        templates: &[Arc<Master>],
        names: Option<&[Option<ArcStr>]>,
        flatten: bool,
    ) -> Result<Vec<CellContent>> {
        let mut renderer = self.config.backend.renderer(writer);
        self.render_with(renderer.as_mut(), templates, names, flatten)
    }

    /// Writes one template and its dependencies to `writer`.
    pub fn instantiate_layout<W: Write>(
        &self,
        writer: W,
        template: &Arc<Master>,
        name: Option<ArcStr>,
        flatten: bool,
    ) -> Result<Vec<CellContent>> {
        let names = [name];
        self.batch_layout(writer, std::slice::from_ref(template), Some(&names), flatten)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use lazy_static::lazy_static;
    use num::rational::Rational64;

    use super::*;
    use crate::config::RenderBackend;
    use crate::coord::Coord;
    use crate::grid::tests::test_grid;
    use crate::params::{ParamValue, ParamsInfo};
    use crate::render::{GenericRenderer, Library};
    use crate::template::{InstanceOpts, PinOpts, ReexportOpts};
    use crate::track::{TrackId, WireArray};

    lazy_static! {
        static ref COUNTED_DRAWS: AtomicUsize = AtomicUsize::new(0);
        static ref SLOW_DRAWS: AtomicUsize = AtomicUsize::new(0);
    }

    pub(crate) fn test_db() -> TemplateDb {
        TemplateDb::builder().grid(test_grid()).build().unwrap()
    }

    fn info(names: &[&str]) -> ParamsInfo {
        names
            .iter()
            .map(|n| (ArcStr::from(*n), arcstr::format!("the {n} parameter")))
            .collect()
    }

    /// A single M1 wire exported as pin `out`.
    pub(crate) struct Inv;

    impl Template for Inv {
        fn params_info(&self) -> ParamsInfo {
            info(&["nf", "rename_dict"])
        }

        fn default_params(&self) -> Params {
            Params::new().with("rename_dict", ParamValue::Map(Default::default()))
        }

        fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
            let nf = b.params().get_int("nf")?;
            b.add_rect("M1", Rect::from_sides(0, 0, 100 * nf, 50))?;
            let warr = WireArray::new(TrackId::single(1, Rational64::from_integer(0), 1), 0, 200);
            let net = b.pin_name("out");
            b.add_pin(net, &[warr], PinOpts::default())?;
            b.set_size((2, 1, 1))?;
            Ok(())
        }
    }

    /// Two inverters, a primitive, and the first inverter's output re-exported.
    struct Buf;

    impl Template for Buf {
        fn params_info(&self) -> ParamsInfo {
            info(&["n"])
        }

        fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
            let n = b.params().get_int("n")?;
            let a = b.new_template(Inv, Params::new().with("nf", n))?;
            let c = b.new_template(Inv, Params::new().with("nf", 2 * n))?;
            let x0 = b.add_instance(&a, InstanceOpts::default())?;
            b.add_instance(
                &c,
                InstanceOpts {
                    loc: (Coord::Units(1000), Coord::Units(0)),
                    nx: 2,
                    spx: Coord::Units(500),
                    ..Default::default()
                },
            )?;
            b.add_instance_primitive("prims", "res", "layout", None, InstanceOpts::default())?;
            b.add_rect("M2", Rect::from_sides(0, 0, 60, 600))?;
            b.reexport(
                &x0.port(Some("out"))?,
                ReexportOpts {
                    net_name: Some("a_out".into()),
                    ..Default::default()
                },
            )?;
            Ok(())
        }
    }

    struct Counted;

    impl Template for Counted {
        fn params_info(&self) -> ParamsInfo {
            info(&["cfg"])
        }

        fn draw_layout(&self, _b: &mut TemplateBuilder) -> Result<()> {
            COUNTED_DRAWS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Slow;

    impl Template for Slow {
        fn params_info(&self) -> ParamsInfo {
            ParamsInfo::new()
        }

        fn draw_layout(&self, _b: &mut TemplateBuilder) -> Result<()> {
            SLOW_DRAWS.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(())
        }
    }

    struct SelfRef;

    impl Template for SelfRef {
        fn params_info(&self) -> ParamsInfo {
            ParamsInfo::new()
        }

        fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
            b.new_template(SelfRef, Params::new())?;
            Ok(())
        }
    }

    struct Failing;

    impl Template for Failing {
        fn params_info(&self) -> ParamsInfo {
            ParamsInfo::new()
        }

        fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
            b.set_size_from_array_box(2)
        }
    }

    struct Conflicting;

    impl Template for Conflicting {
        fn params_info(&self) -> ParamsInfo {
            ParamsInfo::new()
        }

        fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
            let warr = WireArray::new(TrackId::single(1, Rational64::from_integer(0), 1), 0, 200);
            b.add_pin("vdd", &[warr], PinOpts::default())?;
            b.add_pin(
                "vdd",
                &[warr],
                PinOpts {
                    show: false,
                    ..Default::default()
                },
            )
        }
    }

    #[crate::test]
    fn equal_params_are_drawn_once() {
        let db = test_db();
        let map = |pairs: &[(&str, i64)]| {
            ParamValue::Map(pairs.iter().map(|(k, v)| (ArcStr::from(*k), ParamValue::Int(*v))).collect())
        };
        let before = COUNTED_DRAWS.load(Ordering::SeqCst);
        let a = db
            .new_template(Counted, Params::new().with("cfg", map(&[("x", 1), ("y", 2)])))
            .unwrap();
        let b = db
            .new_template(Counted, Params::new().with("cfg", map(&[("y", 2), ("x", 1)])))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(COUNTED_DRAWS.load(Ordering::SeqCst) - before, 1);

        let c = db
            .new_template(Counted, Params::new().with("cfg", map(&[("x", 1), ("y", 3)])))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.cell_name(), "Counted_1");
    }

    #[crate::test]
    fn concurrent_requests_draw_once() {
        let db = test_db();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                thread::spawn(move || db.new_template(Slow, Params::new()).unwrap())
            })
            .collect();
        let masters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(masters.iter().all(|m| Arc::ptr_eq(m, &masters[0])));
        assert_eq!(SLOW_DRAWS.load(Ordering::SeqCst), 1);
    }

    #[crate::test]
    fn cell_names_get_suffixes_in_call_order() {
        let db = test_db();
        let names: Vec<_> = (1..=3)
            .map(|nf| {
                db.new_template(Inv, Params::new().with("nf", nf))
                    .unwrap()
                    .cell_name()
                    .clone()
            })
            .collect();
        assert_eq!(names, ["Inv", "Inv_1", "Inv_2"]);
    }

    #[crate::test]
    fn name_prefix_is_prepended() {
        let db = TemplateDb::builder()
            .grid(test_grid())
            .config(DbConfig {
                name_prefix: "TOP_".into(),
                ..Default::default()
            })
            .build()
            .unwrap();
        let inv = db.new_template(Inv, Params::new().with("nf", 1)).unwrap();
        assert_eq!(inv.cell_name(), "TOP_Inv");
    }

    #[crate::test]
    fn missing_parameter_is_reported() {
        let db = test_db();
        let err = db.new_template(Inv, Params::new()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { ref name, .. } if name == "nf"));
    }

    #[crate::test]
    fn defaults_fill_in_missing_parameters() {
        let db = test_db();
        let inv = db.new_template(Inv, Params::new().with("nf", 2)).unwrap();
        assert!(inv.params().contains("rename_dict"));

        let renamed = Params::new().with("nf", 2).with(
            "rename_dict",
            ParamValue::Map([(ArcStr::from("out"), ParamValue::from("z"))].into_iter().collect()),
        );
        let inv = db.new_template(Inv, renamed).unwrap();
        assert!(inv.has_port("z"));
        assert!(!inv.has_port("out"));
    }

    #[crate::test]
    fn self_reference_is_a_cycle() {
        let db = test_db();
        let err = db.new_template(SelfRef, Params::new()).unwrap_err();
        assert!(matches!(err, Error::CyclicTemplate(_)));
        assert!(!db.contains_cell_name("SelfRef"));
    }

    #[crate::test]
    fn failed_draw_releases_slot_and_name() {
        let db = test_db();
        let err = db.new_template(Failing, Params::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidSize(_)));
        assert!(!db.contains_cell_name("Failing"));
        // A retry draws again instead of returning a cached failure.
        assert!(matches!(
            db.new_template(Failing, Params::new()),
            Err(Error::InvalidSize(_))
        ));
    }

    #[crate::test]
    fn conflicting_pins_are_rejected() {
        let db = test_db();
        let err = db.new_template(Conflicting, Params::new()).unwrap_err();
        assert!(matches!(err, Error::ConflictingPortSpec { ref net, .. } if net == "vdd"));
    }

    #[crate::test]
    fn instance_ports_are_moved_into_parent() {
        let db = test_db();
        let buf = db.new_template(Buf, Params::new().with("n", 1)).unwrap();
        let port = buf.get_port(Some("a_out")).unwrap();
        assert_eq!(port.pins(1)[0].span(), Span::new(0, 200));
        assert_eq!(buf.used_tracks().len(), 1);
        assert_eq!(buf.children().len(), 2);
    }

    #[crate::test]
    fn registry_lookups() {
        let db = TemplateDb::builder()
            .grid(test_grid())
            .register(TemplateId::new("demo", "inv"), Inv)
            .build()
            .unwrap();
        let inv = db
            .new_template_by_id(&TemplateId::new("demo", "inv"), Params::new().with("nf", 1))
            .unwrap();
        assert_eq!(inv.cell_name(), "Inv");
        let err = db
            .new_template_by_id(&TemplateId::new("demo", "nand"), Params::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate(ref id) if id == "demo.nand"));
    }

    #[crate::test]
    fn database_needs_a_grid() {
        let err = TemplateDb::builder().build().unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[crate::test]
    fn hierarchical_cells_follow_their_children() {
        let db = test_db();
        let buf = db.new_template(Buf, Params::new().with("n", 1)).unwrap();
        let cells = db.layout_contents(&[buf], None, false).unwrap();
        let names: Vec<_> = cells.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Inv", "Inv_1", "Buf"]);

        for (i, cell) in cells.iter().enumerate() {
            for inst in cell.instances.iter().filter(|inst| inst.lib == "laygen") {
                let pos = names.iter().position(|n| *n == inst.cell.as_str()).unwrap();
                assert!(pos < i, "{} is emitted after {}", inst.cell, cell.name);
            }
        }
        let top = &cells[2];
        assert_eq!(top.instances.len(), 3);
        assert_eq!(top.instances[1].placement.nx, 2);
        assert_eq!(top.instances[2].cell, "res");
    }

    #[crate::test]
    fn shared_children_are_emitted_once() {
        let db = test_db();
        let b1 = db.new_template(Buf, Params::new().with("n", 1)).unwrap();
        let b2 = db.new_template(Buf, Params::new().with("n", 2)).unwrap();
        let cells = db.layout_contents(&[b1, b2], None, false).unwrap();
        let names: Vec<_> = cells.iter().map(|c| c.name.as_str()).collect();
        // Inv(nf = 2) is used by both buffers.
        assert_eq!(names, ["Inv", "Inv_1", "Buf", "Inv_2", "Buf_1"]);
    }

    #[crate::test]
    fn flattening_expands_template_instances() {
        let db = test_db();
        let buf = db.new_template(Buf, Params::new().with("n", 1)).unwrap();
        let cells = db
            .layout_contents(&[buf], Some(&[Some("flat_buf".into())]), true)
            .unwrap();
        assert_eq!(cells.len(), 1);
        let flat = &cells[0];
        assert_eq!(flat.name, "flat_buf");
        // One primitive survives; no template references remain.
        assert_eq!(flat.instances.len(), 1);
        assert_eq!(flat.instances[0].cell, "res");
        // The top M2 rect, one M1 rect from the first inverter, two from the
        // arrayed second inverter.
        assert_eq!(flat.rects.len(), 4);
        let arrayed: Vec<_> = flat.rects[2..].iter().map(|s| s.array.base().left()).collect();
        assert_eq!(arrayed, [1000, 1500]);
        // Child pins are not copied; the re-exported port is.
        assert!(flat.pins.iter().all(|p| p.net == "a_out"));
        assert_eq!(flat.pins.len(), 1);
    }

    #[crate::test]
    fn top_names_are_validated() {
        let db = test_db();
        let inv = db.new_template(Inv, Params::new().with("nf", 1)).unwrap();
        let inv2 = db.new_template(Inv, Params::new().with("nf", 2)).unwrap();

        let err = db
            .layout_contents(&[inv.clone()], Some(&[Some("Inv_1".into())]), false)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCellName(ref n) if n == "Inv_1"));

        let err = db
            .layout_contents(
                &[inv.clone(), inv2.clone()],
                Some(&[Some("top".into()), Some("top".into())]),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCellName(_)));

        let err = db
            .layout_contents(&[inv, inv2], Some(&[None]), false)
            .unwrap_err();
        assert!(matches!(err, Error::NameListMismatch { templates: 2, names: 1 }));
    }

    #[crate::test]
    fn batch_layout_writes_configured_backend() {
        let db = test_db();
        assert_eq!(db.config().backend, RenderBackend::Generic);
        let buf = db.new_template(Buf, Params::new().with("n", 3)).unwrap();
        let mut out = Vec::new();
        let cells = db.batch_layout(&mut out, &[buf], None, false).unwrap();
        let lib: Library = serde_json::from_slice(&out).unwrap();
        assert_eq!(lib.lib_name, "laygen");
        assert_eq!(lib.cells.len(), cells.len());
        assert_eq!(lib.cells.last().unwrap().name, "Buf");
    }

    #[crate::test]
    fn instantiate_layout_renames_the_top() {
        let db = test_db();
        let inv = db.new_template(Inv, Params::new().with("nf", 4)).unwrap();
        let mut renderer = GenericRenderer::new(Vec::new());
        let cells = db
            .render_with(&mut renderer, &[inv.clone()], Some(&[Some("inv4".into())]), false)
            .unwrap();
        assert_eq!(cells[0].name, "inv4");

        let cells = db
            .instantiate_layout(Vec::new(), &inv, Some("inv4".into()), true)
            .unwrap();
        assert_eq!(cells[0].name, "inv4");
        assert_eq!(cells[0].pins.len(), 1);
    }
}
