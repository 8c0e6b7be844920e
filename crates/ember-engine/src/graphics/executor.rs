use bitflags::bitflags;

use super::command::{Command, CommandKind};
use super::queue::CommandQueue;

bitflags! {
    /// Set of command kinds an executor implements, one flag per [`CommandKind`].
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Capabilities: u32 {
        const PRESENT = 1 << 0;
        const INIT_RENDER_TARGET = 1 << 1;
        const SET_RENDER_TARGET_PARAMETERS = 1 << 2;
        const SET_RENDER_TARGET = 1 << 3;
        const CLEAR = 1 << 4;
        const BLIT = 1 << 5;
        const COMPUTE = 1 << 6;
        const SET_CULL_MODE = 1 << 7;
        const SET_FILL_MODE = 1 << 8;
        const SET_SCISSOR_TEST = 1 << 9;
        const SET_VIEWPORT = 1 << 10;
        const SET_DEPTH_STATE = 1 << 11;
        const SET_PIPELINE_STATE = 1 << 12;
        const DRAW = 1 << 13;
        const PUSH_DEBUG_MARKER = 1 << 14;
        const POP_DEBUG_MARKER = 1 << 15;
        const INIT_BLEND_STATE = 1 << 16;
        const INIT_BUFFER = 1 << 17;
        const SET_BUFFER_DATA = 1 << 18;
        const INIT_SHADER = 1 << 19;
        const SET_SHADER_CONSTANTS = 1 << 20;
        const INIT_TEXTURE = 1 << 21;
        const SET_TEXTURE_DATA = 1 << 22;
        const SET_TEXTURE_PARAMETERS = 1 << 23;
        const SET_TEXTURES = 1 << 24;
        const DELETE_RESOURCE = 1 << 25;
    }
}

impl Capabilities {
    pub const fn for_kind(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Present => Self::PRESENT,
            CommandKind::InitRenderTarget => Self::INIT_RENDER_TARGET,
            CommandKind::SetRenderTargetParameters => Self::SET_RENDER_TARGET_PARAMETERS,
            CommandKind::SetRenderTarget => Self::SET_RENDER_TARGET,
            CommandKind::Clear => Self::CLEAR,
            CommandKind::Blit => Self::BLIT,
            CommandKind::Compute => Self::COMPUTE,
            CommandKind::SetCullMode => Self::SET_CULL_MODE,
            CommandKind::SetFillMode => Self::SET_FILL_MODE,
            CommandKind::SetScissorTest => Self::SET_SCISSOR_TEST,
            CommandKind::SetViewport => Self::SET_VIEWPORT,
            CommandKind::SetDepthState => Self::SET_DEPTH_STATE,
            CommandKind::SetPipelineState => Self::SET_PIPELINE_STATE,
            CommandKind::Draw => Self::DRAW,
            CommandKind::PushDebugMarker => Self::PUSH_DEBUG_MARKER,
            CommandKind::PopDebugMarker => Self::POP_DEBUG_MARKER,
            CommandKind::InitBlendState => Self::INIT_BLEND_STATE,
            CommandKind::InitBuffer => Self::INIT_BUFFER,
            CommandKind::SetBufferData => Self::SET_BUFFER_DATA,
            CommandKind::InitShader => Self::INIT_SHADER,
            CommandKind::SetShaderConstants => Self::SET_SHADER_CONSTANTS,
            CommandKind::InitTexture => Self::INIT_TEXTURE,
            CommandKind::SetTextureData => Self::SET_TEXTURE_DATA,
            CommandKind::SetTextureParameters => Self::SET_TEXTURE_PARAMETERS,
            CommandKind::SetTextures => Self::SET_TEXTURES,
            CommandKind::DeleteResource => Self::DELETE_RESOURCE,
        }
    }

    #[inline]
    pub const fn supports(self, kind: CommandKind) -> bool {
        self.contains(Self::for_kind(kind))
    }
}

impl From<CommandKind> for Capabilities {
    fn from(kind: CommandKind) -> Self {
        Self::for_kind(kind)
    }
}

/// Every kind, so an executor only lists what it leaves out.
impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Backend that realizes a command stream.
///
/// `execute` is only called for kinds listed in `capabilities()`. Executors never fail
/// per command: stale or unknown ids are ignored.
pub trait CommandExecutor {
    fn capabilities(&self) -> Capabilities;

    fn execute(&mut self, command: &Command);
}

/// Runs every command in `queue` once, in order, on the calling thread.
///
/// Kinds the executor does not support are skipped. Returns the number of commands
/// actually handed to the executor.
pub fn execute_queue<E>(executor: &mut E, queue: &CommandQueue) -> usize
where
    E: CommandExecutor + ?Sized,
{
    let caps = executor.capabilities();
    let mut executed = 0;

    for command in queue {
        let kind = command.kind();
        if !caps.supports(kind) {
            log::trace!("executor skips unsupported command {kind:?}");
            continue;
        }
        executor.execute(command);
        executed += 1;
    }

    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::command::{ComputeCmd, PushDebugMarkerCmd, SetDepthStateCmd};
    use crate::graphics::{ResourceRegistry, ShaderId};

    #[derive(Default)]
    struct Recorder {
        caps: Option<Capabilities>,
        seen: Vec<CommandKind>,
    }

    impl CommandExecutor for Recorder {
        fn capabilities(&self) -> Capabilities {
            self.caps.unwrap_or_default()
        }

        fn execute(&mut self, command: &Command) {
            self.seen.push(command.kind());
        }
    }

    #[test]
    fn executes_in_submission_order() {
        let mut q = CommandQueue::new();
        q.push(Command::PushDebugMarker(PushDebugMarkerCmd::new("frame")));
        q.push(Command::SetDepthState(SetDepthStateCmd::new(true, false)));
        q.push(Command::PopDebugMarker);
        q.push(Command::Present);

        let mut rec = Recorder::default();
        let n = execute_queue(&mut rec, &q);

        assert_eq!(n, 4);
        assert_eq!(rec.seen, q.kinds().collect::<Vec<_>>());
    }

    #[test]
    fn unsupported_kinds_are_noops() {
        let reg = ResourceRegistry::new();
        let shader = ShaderId::from_resource(reg.allocate(ShaderId::KIND));

        let mut q = CommandQueue::new();
        q.push(Command::Compute(ComputeCmd::new(shader)));
        q.push(Command::Present);

        let mut rec = Recorder {
            caps: Some(Capabilities::all() - Capabilities::COMPUTE),
            ..Default::default()
        };
        assert_eq!(execute_queue(&mut rec, &q), 1);
        assert_eq!(rec.seen, vec![CommandKind::Present]);
    }

    #[test]
    fn capability_set_operations() {
        let caps = Capabilities::from(CommandKind::Draw);
        assert_eq!(caps, Capabilities::DRAW);
        assert!(caps.supports(CommandKind::Draw));
        assert!(!caps.supports(CommandKind::Clear));
        assert!(CommandKind::ALL.iter().all(|&k| Capabilities::all().supports(k)));
    }

    #[test]
    fn each_kind_has_its_own_flag() {
        let mut seen = Capabilities::empty();
        for kind in CommandKind::ALL {
            let flag = Capabilities::for_kind(kind);
            assert_eq!(flag.bits().count_ones(), 1, "{kind:?}");
            assert!(!seen.intersects(flag), "{kind:?} shares a flag");
            seen |= flag;
        }
        assert_eq!(seen, Capabilities::all());
    }
}
