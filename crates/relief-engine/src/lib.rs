pub mod config;
pub mod raster;
pub mod report;
pub mod seal;
pub mod sequencer;
pub mod session;
pub mod types;
pub mod validate;
pub mod volume;

use config::ConfigError;
use relief_kernel::KernelIntrospect;
use relief_ops::{KernelBundle, Progress, ReliefError};
use tracing::info;

pub use report::{user_message, MessageKind, UserMessage};
pub use sequencer::run_relief;
pub use session::ReliefSession;
pub use types::*;
pub use validate::{preview, validate_inputs, Preview};
pub use volume::RESULT_BODY_NAME;

/// The image relief command.
///
/// Holds the dialog's selections and parameters. One [`ReliefCommand::execute`]
/// call is one execution: validate, confirm large images, run the sequencer,
/// and release the session whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct ReliefCommand {
    pub inputs: ReliefInputs,
}

impl ReliefCommand {
    pub fn new(inputs: ReliefInputs) -> Self {
        Self { inputs }
    }

    /// Replace the parameters with those stored in a preset document.
    /// Selections are kept.
    pub fn apply_preset(&mut self, json: &str) -> Result<(), ConfigError> {
        self.inputs.params = config::load_preset(json)?;
        Ok(())
    }

    /// The current parameters as a preset document.
    pub fn preset(&self) -> Result<String, ConfigError> {
        config::save_preset(&self.inputs.params)
    }

    /// Canvas preview for the current inputs. Does not change geometry.
    pub fn preview(
        &self,
        session: &ReliefSession,
        kernel: &dyn KernelIntrospect,
    ) -> Result<Preview, ReliefError> {
        validate::preview(kernel, session.image(), &self.inputs)
    }

    pub fn execute(
        &self,
        mut session: ReliefSession,
        kb: &mut dyn KernelBundle,
        shell: &mut dyn CommandShell,
        progress: &mut dyn Progress,
    ) -> Result<CommandResult, ReliefFailure> {
        let result = self.run(&session, kb, shell, progress);
        session.release();
        result
    }

    fn run(
        &self,
        session: &ReliefSession,
        kb: &mut dyn KernelBundle,
        shell: &mut dyn CommandShell,
        progress: &mut dyn Progress,
    ) -> Result<CommandResult, ReliefFailure> {
        let image = session.image();
        let selection = validate_inputs(kb.as_introspect(), image, &self.inputs)
            .map_err(ReliefFailure::before_start)?;
        let image = image.ok_or_else(|| {
            ReliefFailure::before_start(ReliefError::MissingSelection {
                what: "image".to_string(),
            })
        })?;

        let params = &self.inputs.params;
        let pixels = image.pixel_count();
        let threshold = params.confirm_threshold();
        if pixels > threshold && !shell.confirm_large_image(pixels, threshold) {
            info!(pixels, threshold, "large image declined");
            return Ok(CommandResult::Declined { pixels, threshold });
        }

        run_relief(kb, progress, image, selection, params, session.id())
            .map(CommandResult::Completed)
    }
}
