use crate::config::PipelineOptions;
use crate::error::{PipelineDiagnostics, PipelineError};
use std::marker::PhantomData;
use tracing::{debug, info_span, trace};

pub trait PipelineStage: Send + Sync {
    type SrcCtx;
    type DstCtx;

    fn name(&self) -> &'static str;
    fn run(
        &self,
        context: Self::SrcCtx,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<Self::DstCtx, PipelineError>;

    /// Text rendering of a stage result, logged when `debug.print_stages` is set.
    fn snapshot(&self, _output: &Self::DstCtx) -> Option<String> {
        None
    }
}

pub struct Pipeline<Src, Dst> {
    run: Box<
        dyn Fn(Src, &mut PipelineDiagnostics, &PipelineOptions) -> Result<Dst, PipelineError>
            + Send
            + Sync,
    >,
    stages: Vec<&'static str>,
}

impl<Src, Dst> Pipeline<Src, Dst> {
    pub fn run(
        &self,
        context: Src,
        diagnostics: &mut PipelineDiagnostics,
        options: &PipelineOptions,
    ) -> Result<Dst, PipelineError> {
        (self.run)(context, diagnostics, options)
    }

    /// Stage names in execution order.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }
}

pub struct PipelineBuilder<Src, Dst> {
    pipeline: Pipeline<Src, Dst>,
    _marker: PhantomData<(Src, Dst)>,
}

impl<Src> PipelineBuilder<Src, Src> {
    pub fn new() -> Self {
        let run = |context: Src,
                   _diagnostics: &mut PipelineDiagnostics,
                   _options: &PipelineOptions| Ok(context);
        Self {
            pipeline: Pipeline {
                run: Box::new(run),
                stages: Vec::new(),
            },
            _marker: PhantomData,
        }
    }
}

impl<Src> Default for PipelineBuilder<Src, Src> {
    fn default() -> Self {
        Self::new()
    }
}

fn run_stage<S>(
    stage: &S,
    context: S::SrcCtx,
    diagnostics: &mut PipelineDiagnostics,
    options: &PipelineOptions,
) -> Result<S::DstCtx, PipelineError>
where
    S: PipelineStage,
{
    let name = stage.name();
    let _span = info_span!("stage", name).entered();
    match stage.run(context, diagnostics) {
        Ok(next) => {
            diagnostics.emit_stage(name, options);
            if options.debug.print_stages {
                if let Some(text) = stage.snapshot(&next) {
                    trace!(stage = name, "\n{}", text);
                }
            }
            Ok(next)
        }
        Err(err) => {
            diagnostics.emit_stage(name, options);
            if err.stage == name {
                Err(err)
            } else {
                Err(PipelineError::new(name, err.message))
            }
        }
    }
}

impl<Src, Mid> PipelineBuilder<Src, Mid> {
    pub fn add_stage<Next, S>(self, stage: S) -> PipelineBuilder<Src, Next>
    where
        S: PipelineStage<SrcCtx = Mid, DstCtx = Next> + 'static,
        Src: 'static,
        Mid: 'static,
        Next: 'static,
    {
        let mut stages = self.pipeline.stages;
        stages.push(stage.name());
        let previous = self.pipeline.run;
        let run = move |context: Src,
                        diagnostics: &mut PipelineDiagnostics,
                        options: &PipelineOptions| {
            let mid = previous(context, diagnostics, options)?;
            run_stage(&stage, mid, diagnostics, options)
        };

        PipelineBuilder {
            pipeline: Pipeline {
                run: Box::new(run),
                stages,
            },
            _marker: PhantomData,
        }
    }

    /// Add a stage that `PipelineOptions::disabled_stages` may skip.
    pub fn add_optional_stage<S>(self, stage: S) -> PipelineBuilder<Src, Mid>
    where
        S: PipelineStage<SrcCtx = Mid, DstCtx = Mid> + 'static,
        Src: 'static,
        Mid: 'static,
    {
        let mut stages = self.pipeline.stages;
        stages.push(stage.name());
        let previous = self.pipeline.run;
        let run = move |context: Src,
                        diagnostics: &mut PipelineDiagnostics,
                        options: &PipelineOptions| {
            let mid = previous(context, diagnostics, options)?;
            if !options.stage_enabled(stage.name()) {
                debug!(stage = stage.name(), "stage disabled, passing through");
                return Ok(mid);
            }
            run_stage(&stage, mid, diagnostics, options)
        };

        PipelineBuilder {
            pipeline: Pipeline {
                run: Box::new(run),
                stages,
            },
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> Pipeline<Src, Mid> {
        self.pipeline
    }
}
