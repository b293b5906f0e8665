//! The compilation pipeline.
//!
//! A fixed, ordered chain of stages owns the control flow from raw source to
//! emitted output resources: attach context → register libraries → lex →
//! parse → attribute collection → function expansion (to fixpoint) →
//! post-expansion tree visit → render → post-render → resource emission.
//! Each stage boundary invokes the hooks registered by the pipeline owner and
//! by every loaded library, so libraries can observe intermediate state
//! without being part of the chain.

use crate::ast::Document;
use crate::context::Context;
use crate::document;
use crate::error::{ErrorPolicy, Result};
use crate::expand;
use crate::function::Library;
use crate::hooks;
use crate::lexer::{self, BlockToken};
use crate::parser;
use crate::render::{self, OutputFormat, OutputResource};
use std::path::PathBuf;
use tracing::debug;
use vellum_types::ScopeId;

/// Engine-facing configuration consumed by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub error_policy: ErrorPolicy,
    pub format: OutputFormat,
    /// Wrap HTML output in a standalone template.
    pub wrap_output: bool,
    /// Overrides the emitted resource name (defaults to the document name).
    pub resource_name: Option<String>,
    /// Base directory for data-reading functions.
    pub working_directory: Option<PathBuf>,
}

/// Optional actions run after each stage completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineHooks {
    pub after_libraries: Option<fn(&Context)>,
    pub after_lexing: Option<fn(&Context, &[BlockToken])>,
    pub after_parsing: Option<fn(&Context, &Document)>,
    pub after_attributes: Option<fn(&Context, &Document)>,
    pub after_expansion: Option<fn(&Context, &Document)>,
    pub after_tree_visit: Option<fn(&Context, &Document)>,
    pub after_rendering: Option<fn(&Context, &str)>,
}

/// The sequential set of actions producing output artifacts from raw source.
///
/// Owns the compilation context; a pipeline instance compiles one document
/// and is discarded afterwards (external cancellation works by dropping the
/// instance, never by interrupting mid-expansion).
pub struct Pipeline {
    ctx: Context,
    options: PipelineOptions,
    hooks: PipelineHooks,
    library_hooks: Vec<PipelineHooks>,
}

impl Pipeline {
    pub fn new(libraries: Vec<Library>, options: PipelineOptions) -> Self {
        Self::with_hooks(libraries, options, PipelineHooks::default())
    }

    pub fn with_hooks(
        libraries: Vec<Library>,
        options: PipelineOptions,
        hooks: PipelineHooks,
    ) -> Self {
        let mut ctx = Context::new();
        ctx.options.error_policy = options.error_policy;
        ctx.options.working_directory = options.working_directory.clone();

        let mut library_hooks = Vec::new();
        for library in libraries {
            if let Some(hooks) = library.hooks {
                library_hooks.push(hooks);
            }
            ctx.register_library(ScopeId::ROOT, library);
        }

        let pipeline = Self {
            ctx,
            options,
            hooks,
            library_hooks,
        };
        pipeline.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_libraries {
                hook(&pipeline.ctx);
            }
        });
        pipeline
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    fn each_hooks(&self, action: impl Fn(&PipelineHooks)) {
        action(&self.hooks);
        for hooks in &self.library_hooks {
            action(hooks);
        }
    }

    /// Runs every stage and returns the emitted resources.
    pub fn execute(&mut self, source: &str) -> Result<Vec<OutputResource>> {
        let (info, body) = document::parse_frontmatter(source)?;
        self.ctx.document_info = info;

        debug!("tokenizing source");
        let tokens = lexer::tokenize_blocks(body);
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_lexing {
                hook(&self.ctx, &tokens);
            }
        });

        debug!(tokens = tokens.len(), "parsing");
        let mut document = Document::new(parser::parse(&tokens, &mut self.ctx, ScopeId::ROOT)?);
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_parsing {
                hook(&self.ctx, &document);
            }
        });

        debug!("collecting attributes");
        let mut attributes = std::mem::take(&mut self.ctx.attributes);
        hooks::collect_attributes(&mut document, &mut attributes, &self.ctx.options);
        self.ctx.attributes = attributes;
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_attributes {
                hook(&self.ctx, &document);
            }
        });

        debug!("expanding function calls");
        expand::expand_all(&mut self.ctx, ScopeId::ROOT)?;
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_expansion {
                hook(&self.ctx, &document);
            }
        });

        debug!("visiting expanded tree");
        hooks::collect_expanded_attributes(&mut self.ctx, &document);
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_tree_visit {
                hook(&self.ctx, &document);
            }
        });

        debug!("rendering");
        let rendered = render::renderer_for(self.options.format).render(&document, &self.ctx);
        self.each_hooks(|hooks| {
            if let Some(hook) = hooks.after_rendering {
                hook(&self.ctx, &rendered);
            }
        });

        let content = match (self.options.format, self.options.wrap_output) {
            (OutputFormat::Html, true) => render::wrap_html(&rendered, &self.ctx),
            _ => rendered,
        };

        let name = self
            .options
            .resource_name
            .clone()
            .or_else(|| self.ctx.document_info.name.clone())
            .unwrap_or_else(|| "Untitled Vellum Document".to_string());

        Ok(vec![OutputResource {
            name,
            content,
            format: self.options.format,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Function;
    use crate::value::{Number, Value};

    fn greeting_library() -> Library {
        Library::new(
            "greeting",
            vec![
                Function::native("greet", vec![], |_, _| {
                    Ok(Value::String("Hello from a function".into()))
                }),
                Function::native("answer", vec![], |_, _| {
                    Ok(Value::Number(Number::Int(42)))
                }),
            ],
        )
    }

    #[test]
    fn test_full_pipeline_plain_text() {
        let options = PipelineOptions {
            format: OutputFormat::PlainText,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(vec![greeting_library()], options);
        let resources = pipeline
            .execute("# Doc\n\nThe answer is .answer today.\n")
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert!(resources[0].content.contains("The answer is 42 today."));
    }

    #[test]
    fn test_frontmatter_feeds_resource_name() {
        let options = PipelineOptions {
            format: OutputFormat::Html,
            wrap_output: true,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(vec![greeting_library()], options);
        let resources = pipeline
            .execute("---\nname: Greetings\n---\n.greet\n")
            .unwrap();
        assert_eq!(resources[0].name, "Greetings");
        assert!(resources[0].content.contains("<title>Greetings</title>"));
        assert!(resources[0].content.contains("Hello from a function"));
    }

    #[test]
    fn test_strict_mode_aborts() {
        let options = PipelineOptions {
            error_policy: ErrorPolicy::Strict,
            format: OutputFormat::PlainText,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(vec![], options);
        assert!(pipeline.execute(".nope\n").is_err());
    }

    #[test]
    fn test_library_hooks_observe_stages() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static OBSERVED: AtomicUsize = AtomicUsize::new(0);

        fn observe(_: &Context, _: &Document) {
            OBSERVED.fetch_add(1, Ordering::SeqCst);
        }

        let observer = Library::new("observer", vec![]).with_hooks(PipelineHooks {
            after_parsing: Some(observe),
            after_expansion: Some(observe),
            ..Default::default()
        });

        let options = PipelineOptions {
            format: OutputFormat::PlainText,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(vec![greeting_library(), observer], options);
        pipeline.execute("plain\n").unwrap();
        assert_eq!(OBSERVED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lenient_mode_substitutes_error_box() {
        let options = PipelineOptions {
            format: OutputFormat::PlainText,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(vec![greeting_library()], options);
        let resources = pipeline
            .execute(".nope\n\nStill .greet here.\n")
            .unwrap();
        let content = &resources[0].content;
        assert!(content.contains(".nope"));
        // The rest of the document is fully expanded regardless.
        assert!(content.contains("Still Hello from a function here."));
    }
}
