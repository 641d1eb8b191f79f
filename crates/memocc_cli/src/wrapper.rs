//! The orchestrator: one wrapped compiler invocation from keys to outputs.
//!
//! ```text
//! bypass flag? ──yes──▶ compile uncached
//!      │no
//! list dependencies ──fail──▶ compile uncached
//!      │
//! compute keys ──fail──▶ compile uncached
//!      │
//! lookup ──hit──▶ restore ──ok──▶ Hit
//!      │miss            │unusable
//!      ▼                ▼
//! compile ──nonzero──▶ Failed (nothing cached)
//!      │ok
//! store outputs, record entry ──▶ Miss
//! ```

use std::path::{Path, PathBuf};

use memocc_cache::{command_key, content_key, Cache, CommandKey, ContentDigest};
use memocc_config::Settings;
use memocc_driver::{
    locate_compiler, resolve_dependencies, Compiler, DependencyMap, Invocation, LocateError,
};
use tracing::{debug, info, warn};

use crate::error::WrapError;

/// How a wrapped invocation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every output was restored from the cache; the compiler did not run.
    Hit,
    /// The compiler ran successfully and its outputs were offered to the cache.
    Miss {
        /// The compiler's exit code.
        exit_code: i32,
    },
    /// The compiler ran without cache keys, so nothing was looked up or stored.
    Uncached {
        /// The compiler's exit code.
        exit_code: i32,
    },
    /// The compiler ran and failed; the cache was left untouched.
    Failed {
        /// The compiler's exit code.
        exit_code: i32,
    },
}

impl Outcome {
    /// Returns the exit code the wrapper should report.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Self::Hit => 0,
            Self::Miss { exit_code }
            | Self::Uncached { exit_code }
            | Self::Failed { exit_code } => exit_code,
        }
    }
}

/// Picks the real compiler: the configured path if any, else a search-path scan.
pub fn resolve_compiler(tool: &str, settings: &Settings) -> Result<PathBuf, LocateError> {
    match &settings.compiler {
        Some(path) => {
            debug!(compiler = %path.display(), "using configured compiler");
            Ok(path.clone())
        }
        None => locate_compiler(tool),
    }
}

/// Runs compiler invocations through the cache of one project directory.
pub struct Wrapper<C: Compiler> {
    compiler: C,
    settings: Settings,
    cache: Cache,
}

impl<C: Compiler> Wrapper<C> {
    /// Creates a wrapper whose relative paths resolve against `project_dir`.
    pub fn new(compiler: C, settings: Settings, project_dir: &Path) -> Self {
        let cache = Cache::open(&settings.cache_dir, project_dir);
        Self {
            compiler,
            settings,
            cache,
        }
    }

    /// Returns the compiler runner.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Returns the project's cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Executes one invocation, restoring from the cache when possible.
    ///
    /// Only a compiler that cannot be run to completion is an error. Every
    /// other problem degrades to compiling directly.
    pub fn execute(&self, invocation: &Invocation) -> Result<Outcome, WrapError> {
        if invocation.has_any_flag_prefix(&self.settings.bypass_flags) {
            debug!("bypass flag present");
            return self.compile_uncached(invocation);
        }

        let deps = match resolve_dependencies(&self.compiler, invocation, &self.settings) {
            Ok(deps) => deps,
            Err(err) => {
                warn!(error = %err, "dependency listing failed, compiling without cache");
                return self.compile_uncached(invocation);
            }
        };

        let inputs: Vec<PathBuf> = deps.inputs().map(|p| self.cache.resolve(p)).collect();
        let content = match content_key(&inputs) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "could not read inputs, compiling without cache");
                return self.compile_uncached(invocation);
            }
        };
        let command = command_key(invocation.argv());
        debug!(command = %command, content = %content, inputs = inputs.len(), "cache keys");

        if let Some(outputs) = self.cache.lookup(&command, &content) {
            match self.cache.restore(&outputs) {
                Ok(()) => {
                    println!("memocc: cache hit, restored {} output(s)", outputs.len());
                    return Ok(Outcome::Hit);
                }
                Err(err) => warn!(error = %err, "cached outputs unusable, recompiling"),
            }
        }

        println!("memocc: cache miss, compiling");
        let exit_code = self.compiler.run(invocation)?;
        if exit_code != 0 {
            info!(exit_code, "compile failed, nothing cached");
            return Ok(Outcome::Failed { exit_code });
        }
        self.populate(&command, content, &deps);
        Ok(Outcome::Miss { exit_code })
    }

    fn compile_uncached(&self, invocation: &Invocation) -> Result<Outcome, WrapError> {
        let exit_code = self.compiler.run(invocation)?;
        Ok(Outcome::Uncached { exit_code })
    }

    /// Stores every declared output and records the entry. Failures only warn.
    fn populate(&self, command: &CommandKey, content: ContentDigest, deps: &DependencyMap) {
        let outputs: Vec<&Path> = deps.outputs().collect();
        if let Some(missing) = outputs.iter().find(|p| !self.cache.resolve(p).is_file()) {
            warn!(output = %missing.display(), "declared output not produced, not caching");
            return;
        }
        let stored = match self.cache.store_outputs(&outputs) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "could not store outputs");
                return;
            }
        };
        match self.cache.record(command, content, stored) {
            Ok(()) => debug!(outputs = outputs.len(), "recorded cache entry"),
            Err(err) => warn!(error = %err, "could not update cache index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memocc_driver::{CapturedOutput, CompilerError};
    use std::cell::Cell;

    /// Stand-in compiler: "compiles" by prefixing each input's bytes.
    struct FakeCompiler {
        dir: PathBuf,
        listing: String,
        listing_exit: i32,
        exit_code: i32,
        produces: Vec<(&'static str, &'static str)>,
        runs: Cell<usize>,
        listings: Cell<usize>,
    }

    impl FakeCompiler {
        fn new(dir: &Path, listing: &str, produces: &[(&'static str, &'static str)]) -> Self {
            Self {
                dir: dir.to_path_buf(),
                listing: listing.to_string(),
                listing_exit: 0,
                exit_code: 0,
                produces: produces.to_vec(),
                runs: Cell::new(0),
                listings: Cell::new(0),
            }
        }
    }

    impl Compiler for FakeCompiler {
        fn capture(&self, _invocation: &Invocation) -> Result<CapturedOutput, CompilerError> {
            self.listings.set(self.listings.get() + 1);
            Ok(CapturedOutput {
                exit_code: self.listing_exit,
                stdout: self.listing.clone().into_bytes(),
                stderr: Vec::new(),
            })
        }

        fn run(&self, _invocation: &Invocation) -> Result<i32, CompilerError> {
            self.runs.set(self.runs.get() + 1);
            if self.exit_code == 0 {
                for (output, input) in &self.produces {
                    let mut bytes = b"spirv:".to_vec();
                    bytes.extend(std::fs::read(self.dir.join(input)).unwrap());
                    std::fs::write(self.dir.join(output), bytes).unwrap();
                }
            }
            Ok(self.exit_code)
        }
    }

    struct Project {
        _root: tempfile::TempDir,
        dir: PathBuf,
        settings: Settings,
    }

    fn project() -> Project {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("shaders");
        std::fs::create_dir_all(&dir).unwrap();
        let settings = Settings::with_cache_dir(root.path().join("cache"));
        Project {
            _root: root,
            dir,
            settings,
        }
    }

    impl Project {
        fn write(&self, name: &str, content: &[u8]) {
            std::fs::write(self.dir.join(name), content).unwrap();
        }

        fn read(&self, name: &str) -> Vec<u8> {
            std::fs::read(self.dir.join(name)).unwrap()
        }

        fn wrapper(&self, compiler: FakeCompiler) -> Wrapper<FakeCompiler> {
            Wrapper::new(compiler, self.settings.clone(), &self.dir)
        }

        fn shader_wrapper(&self) -> Wrapper<FakeCompiler> {
            self.wrapper(FakeCompiler::new(
                &self.dir,
                "shader.spv: shader.vert\n",
                &[("shader.spv", "shader.vert")],
            ))
        }
    }

    /// Counts digest-named artifacts directly under the cache root.
    fn stored_artifacts(cache_dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(cache_dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| name.parse::<ContentDigest>().is_ok())
            })
            .count()
    }

    fn compile_shader() -> Invocation {
        Invocation::new("/usr/bin/glslc", ["-c", "shader.vert", "-o", "shader.spv"])
    }

    #[test]
    fn second_run_hits_without_compiling() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        let first = p.read("shader.spv");
        std::fs::remove_file(p.dir.join("shader.spv")).unwrap();

        assert_eq!(wrapper.execute(&compile_shader()).unwrap(), Outcome::Hit);
        assert_eq!(p.read("shader.spv"), first);
        assert_eq!(wrapper.compiler().runs.get(), 1);
    }

    #[test]
    fn hit_overwrites_stale_output() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        wrapper.execute(&compile_shader()).unwrap();
        let first = p.read("shader.spv");

        p.write("shader.spv", b"stale");
        assert_eq!(wrapper.execute(&compile_shader()).unwrap(), Outcome::Hit);
        assert_eq!(p.read("shader.spv"), first);
    }

    #[test]
    fn changed_input_byte_misses() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        wrapper.execute(&compile_shader()).unwrap();

        p.write("shader.vert", b"void main() {;");
        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        assert_eq!(wrapper.compiler().runs.get(), 2);
        assert_eq!(p.read("shader.spv"), b"spirv:void main() {;");
    }

    #[test]
    fn changed_argument_misses() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        wrapper.execute(&compile_shader()).unwrap();

        let reordered =
            Invocation::new("/usr/bin/glslc", ["-c", "-o", "shader.spv", "shader.vert"]);
        assert_eq!(
            wrapper.execute(&reordered).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        assert_eq!(wrapper.compiler().runs.get(), 2);
        assert_eq!(wrapper.cache().load_index().unwrap().len(), 2);
    }

    #[test]
    fn failed_compile_caches_nothing() {
        let p = project();
        p.write("shader.vert", b"syntax error");
        let mut compiler = FakeCompiler::new(
            &p.dir,
            "shader.spv: shader.vert\n",
            &[("shader.spv", "shader.vert")],
        );
        compiler.exit_code = 1;
        let wrapper = p.wrapper(compiler);

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Failed { exit_code: 1 }
        );
        assert!(wrapper.cache().load_index().unwrap().is_empty());
        assert!(!wrapper.cache().index_file().path().exists());
        assert_eq!(stored_artifacts(wrapper.cache().cache_dir()), 0);
        assert!(!wrapper
            .cache()
            .store()
            .contains(&ContentDigest::from_bytes(b"spirv:syntax error")));

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Failed { exit_code: 1 }
        );
        assert_eq!(wrapper.compiler().runs.get(), 2);
    }

    #[test]
    fn dependency_failure_compiles_uncached() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let mut compiler = FakeCompiler::new(&p.dir, "", &[("shader.spv", "shader.vert")]);
        compiler.listing_exit = 1;
        let wrapper = p.wrapper(compiler);

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        assert_eq!(wrapper.compiler().runs.get(), 2);
        assert!(wrapper.cache().load_index().unwrap().is_empty());
    }

    #[test]
    fn unparseable_listing_compiles_uncached() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.wrapper(FakeCompiler::new(
            &p.dir,
            "note: something unexpected\n",
            &[("shader.spv", "shader.vert")],
        ));
        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
    }

    #[test]
    fn missing_input_compiles_uncached() {
        let p = project();
        let wrapper = p.wrapper(FakeCompiler::new(&p.dir, "shader.spv: shader.vert\n", &[]));
        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
    }

    #[test]
    fn missing_artifact_recompiles() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        wrapper.execute(&compile_shader()).unwrap();

        let digest = memocc_cache::artifact_digest(&p.dir.join("shader.spv")).unwrap();
        std::fs::remove_file(wrapper.cache().store().artifact_path(&digest)).unwrap();

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        assert_eq!(wrapper.compiler().runs.get(), 2);
        assert!(wrapper.cache().store().contains(&digest));
    }

    #[test]
    fn corrupt_artifact_recompiles() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        wrapper.execute(&compile_shader()).unwrap();

        let digest = memocc_cache::artifact_digest(&p.dir.join("shader.spv")).unwrap();
        std::fs::write(wrapper.cache().store().artifact_path(&digest), b"bit rot").unwrap();

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        assert_eq!(p.read("shader.spv"), b"spirv:void main() {}");
    }

    #[test]
    fn bypass_flag_skips_cache() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.shader_wrapper();
        let preprocess = Invocation::new("/usr/bin/glslc", ["-E", "shader.vert"]);

        assert_eq!(
            wrapper.execute(&preprocess).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        assert_eq!(wrapper.compiler().listings.get(), 0);
        assert!(wrapper.cache().load_index().unwrap().is_empty());
    }

    fn depfile_compiler(p: &Project, depfile: &'static str) -> FakeCompiler {
        FakeCompiler::new(
            &p.dir,
            "shader.spv: shader.vert\n",
            &[("shader.spv", "shader.vert"), (depfile, "shader.vert")],
        )
    }

    #[test]
    fn depfile_invocation_is_never_cached() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.wrapper(depfile_compiler(&p, "shader.spv.d"));
        let invocation =
            Invocation::new("/usr/bin/glslc", ["-c", "shader.vert", "-o", "shader.spv", "-MD"]);

        assert_eq!(
            wrapper.execute(&invocation).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        std::fs::remove_file(p.dir.join("shader.spv")).unwrap();
        std::fs::remove_file(p.dir.join("shader.spv.d")).unwrap();

        assert_eq!(
            wrapper.execute(&invocation).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        assert!(p.dir.join("shader.spv").is_file());
        assert!(p.dir.join("shader.spv.d").is_file());
        assert_eq!(wrapper.compiler().runs.get(), 2);
        assert_eq!(wrapper.compiler().listings.get(), 0);
        assert!(wrapper.cache().load_index().unwrap().is_empty());
    }

    #[test]
    fn joined_depfile_flag_is_never_cached() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.wrapper(depfile_compiler(&p, "deps/shader.d"));
        std::fs::create_dir_all(p.dir.join("deps")).unwrap();
        let invocation = Invocation::new(
            "/usr/bin/glslc",
            ["-c", "shader.vert", "-o", "shader.spv", "-MD", "-MFdeps/shader.d"],
        );

        wrapper.execute(&invocation).unwrap();
        std::fs::remove_file(p.dir.join("deps/shader.d")).unwrap();
        assert_eq!(
            wrapper.execute(&invocation).unwrap(),
            Outcome::Uncached { exit_code: 0 }
        );
        assert!(p.dir.join("deps/shader.d").is_file());
        assert_eq!(wrapper.compiler().runs.get(), 2);
    }

    #[test]
    fn unproduced_output_is_not_recorded() {
        let p = project();
        p.write("shader.vert", b"void main() {}");
        let wrapper = p.wrapper(FakeCompiler::new(&p.dir, "shader.spv: shader.vert\n", &[]));

        assert_eq!(
            wrapper.execute(&compile_shader()).unwrap(),
            Outcome::Miss { exit_code: 0 }
        );
        assert!(wrapper.cache().load_index().unwrap().is_empty());
    }

    #[test]
    fn link_mode_caches_default_output() {
        let p = project();
        p.write("a.vert", b"vertex");
        let wrapper = p.wrapper(FakeCompiler::new(
            &p.dir,
            "a.vert.spv: a.vert\n",
            &[("a.spv", "a.vert")],
        ));
        let link = Invocation::new("/usr/bin/glslc", ["a.vert"]);

        wrapper.execute(&link).unwrap();
        std::fs::remove_file(p.dir.join("a.spv")).unwrap();
        assert_eq!(wrapper.execute(&link).unwrap(), Outcome::Hit);
        assert_eq!(p.read("a.spv"), b"spirv:vertex");
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(Outcome::Hit.exit_code(), 0);
        assert_eq!(Outcome::Miss { exit_code: 0 }.exit_code(), 0);
        assert_eq!(Outcome::Failed { exit_code: 2 }.exit_code(), 2);
        assert_eq!(Outcome::Uncached { exit_code: 3 }.exit_code(), 3);
    }

    #[test]
    fn configured_compiler_skips_scan() {
        let mut settings = Settings::with_cache_dir("/cache");
        settings.compiler = Some(PathBuf::from("/opt/vulkan/bin/glslc"));
        assert_eq!(
            resolve_compiler("glslc", &settings).unwrap(),
            PathBuf::from("/opt/vulkan/bin/glslc")
        );
    }
}
