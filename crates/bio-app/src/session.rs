//! Budget session: one run directory or archive, its grid and its budget cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bio_core::keys::is_wake_term;
use bio_core::{Grid, nearest_value};
use bio_project::{ConfigParser, NamelistParser, PhysicsSummary, RunConfig, SortKey, TurbineArray};
use bio_results::{
    ArchiveFormat, ArchiveMetadata, ArchiveSource, BackendKind, BudgetSource, RawSource,
    ResultsError, ResultsResult, TurbineProperty, turbine_series_key,
};
use ndarray::{Array1, Array3};

use crate::cache::BudgetCache;
use crate::error::{AppError, AppResult};
use crate::readers::TidxSelection;
use crate::report::{Notice, ReadReport};
use crate::slice::{Bound, SliceBounds, SliceResult, XyProfiles, slice_arrays, xy_average};
use crate::terms::{self, TermSelector};
use crate::wake::{InflowSource, WakeOptions, inlet_profile, wake_deficit};

/// Where to move the coordinate origin after opening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    /// Position of the first turbine after sorting by streamwise location.
    Turbine,
    Point([f64; 3]),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub backend: BackendKind,
    /// Run id to match against `io.runid` of the input files.
    pub run_id: Option<u32>,
    /// File-name stem of archives; defaults to [`default_stem`] of the directory.
    pub stem: Option<String>,
    pub origin: Option<Origin>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::Raw,
            run_id: None,
            stem: None,
            origin: None,
        }
    }
}

impl SessionOptions {
    pub fn raw(run_id: u32) -> Self {
        Self {
            run_id: Some(run_id),
            ..Self::default()
        }
    }

    pub fn archive(format: ArchiveFormat) -> Self {
        Self {
            backend: BackendKind::Archive(format),
            ..Self::default()
        }
    }
}

/// Last non-empty run of word characters in `dir`.
pub fn default_stem(dir: &Path) -> String {
    dir.to_string_lossy()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .rfind(|s| !s.is_empty())
        .unwrap_or("budgets")
        .to_string()
}

#[derive(Debug, Clone)]
pub(crate) enum Backend {
    Raw(RawSource),
    Archive(ArchiveSource),
}

impl Backend {
    pub(crate) fn source(&self) -> &dyn BudgetSource {
        match self {
            Backend::Raw(src) => src,
            Backend::Archive(src) => src,
        }
    }
}

/// Parameters of an archive write.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub format: ArchiveFormat,
    pub terms: TermSelector,
    pub bounds: SliceBounds,
    /// Destination directory; defaults to the session directory.
    pub dir: Option<PathBuf>,
    /// Defaults to the session stem.
    pub stem: Option<String>,
    pub overwrite: bool,
}

impl WriteRequest {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            terms: TermSelector::Default,
            bounds: SliceBounds::full(),
            dir: None,
            stem: None,
            overwrite: false,
        }
    }
}

#[derive(Debug)]
pub struct BudgetSession {
    pub(crate) dir: PathBuf,
    pub(crate) stem: String,
    pub(crate) backend: Backend,
    pub(crate) config: RunConfig,
    pub(crate) physics: PhysicsSummary,
    pub(crate) grid: Grid,
    pub(crate) turbines: Option<TurbineArray>,
    pub(crate) metadata: Option<ArchiveMetadata>,
    pub(crate) cache: BudgetCache,
    pub(crate) has_budgets: bool,
    pub(crate) budget_tidxs: Vec<u32>,
    pub(crate) last_n: Option<u32>,
    pub(crate) fields: BTreeMap<String, Array3<f64>>,
    pub(crate) field_tidxs: Vec<u32>,
    pub(crate) field_tidx: Option<u32>,
    pub(crate) sim_time: Option<f64>,
}

/// Treats "no files of this kind" as an empty index.
fn optional_index(result: ResultsResult<Vec<u32>>, what: &str) -> AppResult<Vec<u32>> {
    match result {
        Ok(values) => Ok(values),
        Err(ResultsError::DatasetNotFound { dir, .. }) => {
            tracing::warn!(dir = %dir, "no {what} found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn find_config(dir: &Path, run_id: Option<u32>, parser: &dyn ConfigParser) -> AppResult<RunConfig> {
    let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "dat"))
        .collect();
    inputs.sort();
    let Some(first) = inputs.first() else {
        return Err(AppError::NoConfig {
            dir: dir.to_path_buf(),
        });
    };

    if let Some(want) = run_id {
        for path in &inputs {
            match parser.parse_file(path) {
                Ok(config) if config.get_i64("io", "runid") == Some(i64::from(want)) => {
                    tracing::debug!(file = %path.display(), run_id = want, "matched input file");
                    return Ok(config);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(file = %path.display(), error = %e, "skipping unreadable input file")
                }
            }
        }
        tracing::warn!(run_id = want, "no input file matches the run id, using the first one");
    }
    tracing::debug!(file = %first.display(), "reading input file");
    Ok(parser.parse_file(first)?)
}

fn load_turbines(dir: &Path, config: &RunConfig, parser: &dyn ConfigParser) -> Option<TurbineArray> {
    if !config
        .get_bool("windturbines", "usewindturbines")
        .unwrap_or(false)
    {
        return None;
    }
    let turb_dir = match config.get_str("windturbines", "turbinfodir").map(PathBuf::from) {
        Some(p) if p.is_dir() => p,
        // the run directory may have been moved along with its turbine decks
        _ => dir.join("turb"),
    };
    let num_turbines = config
        .get_i64("windturbines", "num_turbines")
        .and_then(|n| usize::try_from(n).ok());
    let adm_type = config.get_i64("windturbines", "adm_type").unwrap_or(0);

    match TurbineArray::from_dir(&turb_dir, num_turbines, adm_type, parser) {
        Ok(array) => {
            tracing::info!(count = array.len(), dir = %turb_dir.display(), "turbine array loaded");
            Some(array)
        }
        Err(e) => {
            tracing::warn!(error = %e, "turbine files not found, continuing without turbines");
            None
        }
    }
}

impl BudgetSession {
    pub fn open(dir: impl AsRef<Path>, options: SessionOptions) -> AppResult<Self> {
        Self::open_with_parser(dir, options, &NamelistParser)
    }

    /// Opens a session, parsing input files with `parser` instead of the namelist parser.
    pub fn open_with_parser(
        dir: impl AsRef<Path>,
        options: SessionOptions,
        parser: &dyn ConfigParser,
    ) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ResultsError::DatasetNotFound {
                dir: dir.display().to_string(),
                what: "run directory".to_string(),
            }
            .into());
        }
        let stem = options.stem.clone().unwrap_or_else(|| default_stem(&dir));

        let mut session = match options.backend {
            BackendKind::Raw => Self::init_raw(dir, stem, options.run_id, parser)?,
            BackendKind::Archive(format) => Self::init_archive(dir, stem, format)?,
        };
        if let Some(origin) = options.origin {
            session.normalize_origin(origin);
        }

        tracing::info!(
            dir = %session.dir.display(),
            backend = %session.backend_kind(),
            shape = ?session.grid.dims(),
            budgets = session.has_budgets,
            "budget session opened"
        );
        Ok(session)
    }

    fn init_raw(
        dir: PathBuf,
        stem: String,
        run_id: Option<u32>,
        parser: &dyn ConfigParser,
    ) -> AppResult<Self> {
        let config = find_config(&dir, run_id, parser)?;
        let physics = PhysicsSummary::from_config(&config);
        let run_id = physics.run_id.or(run_id).ok_or(AppError::NoRunId)?;
        let turbines = load_turbines(&dir, &config, parser);

        let lengths = [
            config.require_f64("lx")?,
            config.require_f64("ly")?,
            config.require_f64("lz")?,
        ];
        let counts = [
            config.require_usize("nx")?,
            config.require_usize("ny")?,
            config.require_usize("nz")?,
        ];
        let grid = Grid::from_extents(lengths, counts)?;

        let raw = RawSource::new(&dir, run_id);
        let field_tidxs = optional_index(raw.field_tidxs(), "field dumps")?;
        let budget_tidxs = optional_index(raw.budget_tidx_list(), "budget dumps")?;
        let last_n = if budget_tidxs.is_empty() {
            None
        } else {
            raw.last_budget_n().ok()
        };

        Ok(Self {
            dir,
            stem,
            backend: Backend::Raw(raw),
            config,
            physics,
            grid,
            turbines,
            metadata: None,
            cache: BudgetCache::new(budget_tidxs.last().copied(), last_n),
            has_budgets: !budget_tidxs.is_empty(),
            budget_tidxs,
            last_n,
            fields: BTreeMap::new(),
            field_tidx: None,
            field_tidxs,
            sim_time: None,
        })
    }

    fn init_archive(dir: PathBuf, stem: String, format: ArchiveFormat) -> AppResult<Self> {
        let source = ArchiveSource::new(&dir, &stem, format);
        let metadata = source.read_metadata()?;
        let physics = PhysicsSummary::from_config(&metadata.config);
        let grid = Grid::from_axes(
            Array1::from(metadata.x.clone()),
            Array1::from(metadata.y.clone()),
            Array1::from(metadata.z.clone()),
            metadata.origin,
        )?;
        let has_budgets = source.has_budgets();
        if !has_budgets {
            tracing::warn!(path = %source.budgets_path().display(), "no archived budgets found");
        }

        Ok(Self {
            dir,
            stem,
            backend: Backend::Archive(source),
            config: metadata.config.clone(),
            physics,
            grid,
            turbines: metadata.turbines.clone(),
            metadata: Some(metadata),
            cache: BudgetCache::default(),
            has_budgets,
            budget_tidxs: Vec::new(),
            last_n: None,
            fields: BTreeMap::new(),
            field_tidxs: Vec::new(),
            field_tidx: None,
            sim_time: None,
        })
    }

    // ---- accessors ----

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.source().kind()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsSummary {
        &self.physics
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn turbines(&self) -> Option<&TurbineArray> {
        self.turbines.as_ref()
    }

    pub fn metadata(&self) -> Option<&ArchiveMetadata> {
        self.metadata.as_ref()
    }

    pub fn has_budgets(&self) -> bool {
        self.has_budgets
    }

    pub fn has_fields(&self) -> bool {
        !self.field_tidxs.is_empty()
    }

    pub fn has_turbines(&self) -> bool {
        self.turbines.is_some()
    }

    pub fn budgets(&self) -> &BudgetCache {
        &self.cache
    }

    pub fn budget(&self, name: &str) -> Option<&Array3<f64>> {
        self.cache.get(name)
    }

    /// Time index the cache is bound to.
    pub fn budget_tidx(&self) -> Option<u32> {
        self.cache.tidx()
    }

    pub fn budget_n(&self) -> Option<u32> {
        self.cache.n()
    }

    /// Largest sample count found among the budget dumps.
    pub fn last_n(&self) -> Option<u32> {
        self.last_n
    }

    pub fn budget_tidxs(&self) -> &[u32] {
        &self.budget_tidxs
    }

    // ---- grid ----

    /// Moves the origin to `target`, or back to the unshifted frame for `None`.
    pub fn recenter(&mut self, target: Option<[f64; 3]>) {
        self.grid.recenter(target);
    }

    /// Sorts the turbines by `key` and moves the origin to the first one.
    /// Returns false when the session has no turbines.
    pub fn recenter_on_turbine(&mut self, key: SortKey) -> bool {
        let Some(turbines) = self.turbines.as_mut() else {
            return false;
        };
        turbines.set_sort(key, true, false);
        let Some(pos) = turbines.first().map(|t| t.pos()) else {
            return false;
        };
        self.grid.recenter(Some(pos));
        true
    }

    pub fn normalize_origin(&mut self, origin: Origin) {
        match origin {
            Origin::Point(p) => self.recenter(Some(p)),
            Origin::Turbine => {
                if !self.recenter_on_turbine(SortKey::XLoc) {
                    tracing::warn!("no turbines to center on, origin unchanged");
                }
            }
        }
    }

    // ---- availability ----

    pub fn existing_budgets(&self) -> AppResult<Vec<u8>> {
        Ok(self.backend.source().existing_budgets()?)
    }

    pub fn existing_terms(&self, budgets: Option<&[u8]>, include_wakes: bool) -> AppResult<Vec<String>> {
        Ok(self.backend.source().existing_terms(budgets, include_wakes)?)
    }

    /// Changes the archive file stem. Archive sessions read from the renamed archive afterwards.
    pub fn set_filename(&mut self, stem: impl Into<String>) {
        self.stem = stem.into();
        if let Backend::Archive(src) = &mut self.backend {
            src.set_stem(self.stem.clone());
        }
    }

    // ---- budget cache ----

    /// Loads the selected budget terms into the cache.
    ///
    /// `tidx` of `None` keeps the cache's time index (the last budget dump initially). An
    /// absent time index is replaced by the nearest existing one. Cached terms are skipped
    /// unless `overwrite` is set. Wake terms are computed from the mean velocities.
    pub fn read_budgets(
        &mut self,
        selector: &TermSelector,
        tidx: Option<u32>,
        overwrite: bool,
    ) -> AppResult<ReadReport> {
        if !self.has_budgets {
            return Err(AppError::NoBudgets);
        }
        let existing = self.existing_terms(None, false)?;
        let requested = selector
            .requested_names(&self.cache.names())
            .unwrap_or_else(|| existing.clone());
        // archives may store wake terms; everything else derives them
        let (wakes, requested): (Vec<String>, Vec<String>) = requested
            .into_iter()
            .partition(|n| is_wake_term(n) && !existing.contains(n));

        let mut report = ReadReport::new();
        if !requested.is_empty() || wakes.is_empty() {
            report.merge(self.load_terms(requested, tidx, overwrite)?);
        }
        if !wakes.is_empty() {
            let options = WakeOptions {
                include_w: wakes.iter().any(|w| w == "wwake"),
                overwrite,
                ..WakeOptions::default()
            };
            report.merge(self.compute_wake(options, tidx)?);
        }
        Ok(report)
    }

    fn load_terms(
        &mut self,
        requested: Vec<String>,
        tidx: Option<u32>,
        overwrite: bool,
    ) -> AppResult<ReadReport> {
        let mut report = ReadReport::new();
        let existing = self.existing_terms(None, false)?;
        let resolution = terms::partition(&requested, &existing);
        for name in resolution.invalid {
            report.push(Notice::TermNotFound(name));
        }
        for name in resolution.missing {
            report.push(Notice::TermNotAvailable(name));
        }
        let tidx = self.effective_tidx(tidx, &mut report)?;
        self.cache.switch_tidx(tidx);
        if resolution.valid.is_empty() {
            report.push(Notice::NoTermsSelected);
            return Ok(report);
        }

        let mut to_load = resolution.valid;
        if !overwrite {
            let (cached, rest): (Vec<String>, Vec<String>) =
                to_load.into_iter().partition(|n| self.cache.contains(n));
            if !cached.is_empty() {
                report.push(Notice::AlreadyLoaded(cached));
            }
            to_load = rest;
        }
        if to_load.is_empty() {
            return Ok(report);
        }

        let loaded = self
            .backend
            .source()
            .load(&to_load, tidx, self.grid.dims())?;
        for name in &loaded.missing {
            report.push(Notice::TermNotAvailable(name.clone()));
        }
        for name in &loaded.unreadable {
            report.push(Notice::TermUnreadable(name.clone()));
        }
        report.loaded = self.cache.merge(loaded);
        tracing::info!(tidx = ?self.cache.tidx(), n = ?self.cache.n(), terms = ?report.loaded, "budgets loaded");
        Ok(report)
    }

    fn effective_tidx(&self, requested: Option<u32>, report: &mut ReadReport) -> AppResult<Option<u32>> {
        if let Backend::Archive(_) = self.backend {
            if let Some(t) = requested {
                tracing::debug!(tidx = t, "archives hold a single snapshot, ignoring time index");
            }
            return Ok(None);
        }
        let Some(t) = requested else {
            return Ok(self.cache.tidx().or(self.budget_tidxs.last().copied()));
        };
        if self.budget_tidxs.contains(&t) {
            return Ok(Some(t));
        }
        let used = nearest_value(&self.budget_tidxs, t).ok_or(AppError::NoBudgets)?;
        report.push(Notice::TimeIndexSubstituted { requested: t, used });
        Ok(Some(used))
    }

    /// Empties the cache and rebinds it to the last budget time index. Returns the cleared names.
    pub fn clear_budgets(&mut self) -> Vec<String> {
        let cleared = self
            .cache
            .reset(self.budget_tidxs.last().copied(), self.last_n);
        tracing::debug!(cleared = ?cleared, "budgets cleared");
        cleared
    }

    // ---- wake ----

    /// Computes `uwake`, `vwake` (and `wwake` when requested) into the cache.
    pub fn calc_wake(&mut self, options: WakeOptions) -> AppResult<ReadReport> {
        self.compute_wake(options, None)
    }

    fn compute_wake(&mut self, options: WakeOptions, tidx: Option<u32>) -> AppResult<ReadReport> {
        let mut targets = vec!["uwake", "vwake"];
        let mut required = vec!["ubar", "vbar"];
        if options.include_w {
            targets.push("wwake");
            required.push("wbar");
        }
        let mut report = ReadReport::new();

        if tidx.is_some() {
            report.merge(self.load_terms(to_strings(&required), tidx, false)?);
        }
        if targets.iter().all(|t| self.cache.contains(t)) && !options.overwrite {
            report.push(Notice::WakeAlreadyComputed);
            return Ok(report);
        }
        if !required.iter().all(|t| self.cache.contains(t)) {
            report.merge(self.load_terms(to_strings(&required), None, false)?);
        }

        let means = (self.cache.get("ubar"), self.cache.get("vbar"), self.cache.get("wbar"));
        let (ubar, vbar, wbar) = match means {
            (Some(u), Some(v), w) if w.is_some() || !options.include_w => (u, v, w),
            _ => {
                for name in targets {
                    report.push(Notice::TermNotAvailable(name.to_string()));
                }
                return Ok(report);
            }
        };

        let z = self.grid.z().coords().clone();
        let zeros = Array1::zeros(z.len());
        let (u_in, v_in, w_in) = match &options.source {
            InflowSource::Budgets => (inlet_profile(ubar.view()), inlet_profile(vbar.view()), zeros),
            InflowSource::PlaneAverage => (xy_average(ubar.view()), xy_average(vbar.view()), zeros),
            InflowSource::Profile(profile) => {
                let vel = profile.velocity(&z)?;
                (vel.u, vel.v, vel.w)
            }
        };

        let mut computed = vec![
            ("uwake", wake_deficit(&u_in, ubar)?),
            ("vwake", wake_deficit(&v_in, vbar)?),
        ];
        if let (true, Some(wbar)) = (options.include_w, wbar) {
            // vertical wake is mean minus inflow
            computed.push(("wwake", -wake_deficit(&w_in, wbar)?));
        }
        for (name, arr) in computed {
            self.cache.insert(name, arr);
            report.loaded.push(name.to_string());
        }
        tracing::debug!(terms = ?report.loaded, "wake deficit computed");
        Ok(report)
    }

    // ---- slicing ----

    fn axes(&self) -> [&Array1<f64>; 3] {
        [
            self.grid.x().coords(),
            self.grid.y().coords(),
            self.grid.z().coords(),
        ]
    }

    /// Reads the selected terms and slices them.
    pub fn slice(
        &mut self,
        selector: &TermSelector,
        tidx: Option<u32>,
        bounds: SliceBounds,
        overwrite: bool,
        round_extent: bool,
    ) -> AppResult<(SliceResult, ReadReport)> {
        let report = self.read_budgets(selector, tidx, overwrite)?;
        let names = selector
            .requested_names(&self.cache.names())
            .unwrap_or_else(|| self.cache.names());
        let arrays = names
            .iter()
            .filter_map(|n| self.cache.get(n).map(|a| (n.clone(), a.view())));
        let sl = slice_arrays(arrays, self.axes(), bounds, round_extent)?;
        Ok((sl, report))
    }

    /// Slices an ad-hoc mapping shaped like the grid.
    pub fn slice_fields(
        &self,
        fields: &BTreeMap<String, Array3<f64>>,
        keys: Option<&[String]>,
        bounds: SliceBounds,
        round_extent: bool,
    ) -> AppResult<SliceResult> {
        let arrays = fields
            .iter()
            .filter(|(name, _)| keys.is_none_or(|k| k.contains(name)))
            .map(|(name, arr)| (name.clone(), arr.view()));
        slice_arrays(arrays, self.axes(), bounds, round_extent)
    }

    /// Horizontally averaged vertical profiles of the selected terms.
    pub fn xy_avg(&mut self, selector: &TermSelector, z: Bound, tidx: Option<u32>) -> AppResult<XyProfiles> {
        let (sl, _) = self.slice(selector, tidx, SliceBounds::full().z(z), false, false)?;
        XyProfiles::from_slice(&sl)
    }

    // ---- archive writes ----

    /// Writes the selected (and sliced) terms plus metadata as one archive.
    ///
    /// Fails with a destination-exists error when the archive is present and
    /// `overwrite` is not set; nothing is written then.
    pub fn write_archive(&mut self, request: &WriteRequest) -> AppResult<PathBuf> {
        if !self.has_budgets {
            return Err(AppError::NoBudgets);
        }
        let dir = request.dir.clone().unwrap_or_else(|| self.dir.clone());
        let stem = request.stem.clone().unwrap_or_else(|| self.stem.clone());
        let dest = bio_results::archive::budgets_path(&dir, &stem, request.format);
        if dest.exists() && !request.overwrite {
            return Err(ResultsError::DestinationExists {
                path: dest.display().to_string(),
            }
            .into());
        }

        let (sl, _) = self.slice(&request.terms, None, request.bounds, false, false)?;
        if sl.arrays.is_empty() {
            return Err(AppError::InvalidInput("no terms selected for writing".to_string()));
        }

        let mut metadata = ArchiveMetadata::new(
            request.format,
            self.config.clone(),
            sl.axes.clone().map(|a| a.to_vec()),
            self.grid.origin(),
        );
        metadata.turbines = self.turbines.clone();
        metadata.turbine_series = self.collect_turbine_series();
        metadata.source_tidx = self.cache.tidx();
        metadata.source_n = self.cache.n();

        Ok(bio_results::write_archive(
            request.format,
            &dir,
            &stem,
            &sl.arrays,
            &metadata,
            request.overwrite,
        )?)
    }

    fn collect_turbine_series(&self) -> BTreeMap<String, Vec<f64>> {
        let mut series = BTreeMap::new();
        let Some(turbines) = &self.turbines else {
            return series;
        };
        for k in 1..=turbines.len() {
            for prop in TurbineProperty::ALL {
                match self.read_turbine_property(TidxSelection::All, prop, k, Some(false)) {
                    Ok(values) => {
                        series.insert(turbine_series_key(k, prop), values);
                    }
                    Err(e) => tracing::debug!(turbine = k, %prop, error = %e, "turbine series skipped"),
                }
            }
        }
        series
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
