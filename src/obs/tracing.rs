// self
use crate::{_prelude::*, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("mentorai_client.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warn-level event for a failure the client absorbed instead of returning.
pub fn warn_absorbed(kind: OpKind, message: &str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = kind.as_str(), %error, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, message, error);
	}
}

/// Emits a debug-level event describing a pipeline decision.
pub fn debug_event(kind: OpKind, stage: &'static str, message: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = kind.as_str(), stage, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage, message);
	}
}
