use crate::coords::Rect;

use super::command::Command;
use super::resource::{BlendStateId, ShaderId, TextureId};
use super::types::{CullMode, FillMode, TEXTURE_LAYERS};

/// Sticky pipeline state set by the `Set*` commands and consumed by `Clear` / `Draw`.
///
/// Every value persists until the next command overriding it, across frames.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderState {
    /// `None` draws to the back buffer.
    pub render_target: Option<TextureId>,
    /// `None` covers the whole target.
    pub viewport: Option<Rect>,
    /// `Some` while the scissor test is enabled.
    pub scissor: Option<Rect>,
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend_state: Option<BlendStateId>,
    pub shader: Option<ShaderId>,
    pub textures: [Option<TextureId>; TEXTURE_LAYERS],
    pub fragment_constants: Vec<Vec<f32>>,
    pub vertex_constants: Vec<Vec<f32>>,
}

impl RenderState {
    /// Applies `command` if it is a state-set command. Returns `false` for any other kind.
    pub fn apply(&mut self, command: &Command) -> bool {
        match command {
            Command::SetRenderTarget(cmd) => self.render_target = cmd.render_target,
            Command::SetCullMode(cmd) => self.cull_mode = cmd.cull_mode,
            Command::SetFillMode(cmd) => self.fill_mode = cmd.fill_mode,
            Command::SetScissorTest(cmd) => {
                self.scissor = cmd.enabled.then_some(cmd.rect);
            }
            Command::SetViewport(cmd) => self.viewport = Some(cmd.viewport),
            Command::SetDepthState(cmd) => {
                self.depth_test = cmd.depth_test;
                self.depth_write = cmd.depth_write;
            }
            Command::SetPipelineState(cmd) => {
                self.blend_state = Some(cmd.blend_state);
                self.shader = Some(cmd.shader);
            }
            Command::SetTextures(cmd) => self.textures = cmd.textures,
            Command::SetShaderConstants(cmd) => {
                self.fragment_constants.clone_from(&cmd.fragment_constants);
                self.vertex_constants.clone_from(&cmd.vertex_constants);
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::command::{SetCullModeCmd, SetScissorTestCmd};

    #[test]
    fn state_persists_until_overridden() {
        let mut state = RenderState::default();
        assert!(state.apply(&Command::SetCullMode(SetCullModeCmd::new(CullMode::Back))));
        assert!(!state.apply(&Command::Present));
        assert_eq!(state.cull_mode, CullMode::Back);

        state.apply(&Command::SetCullMode(SetCullModeCmd::new(CullMode::Front)));
        assert_eq!(state.cull_mode, CullMode::Front);
    }

    #[test]
    fn disabling_scissor_drops_rect() {
        let mut state = RenderState::default();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        state.apply(&Command::SetScissorTest(SetScissorTestCmd::new(true, rect)));
        assert_eq!(state.scissor, Some(rect));
        state.apply(&Command::SetScissorTest(SetScissorTestCmd::new(false, rect)));
        assert_eq!(state.scissor, None);
    }
}
