//! End-to-end tests for the renderer facade against the headless driver

#[cfg(test)]
mod tests {
    use crate::driver::{gl, DriverCall};
    use crate::foundation::logging;
    use crate::prelude::*;

    const VERTEX: &str = "attribute vec3 inPosition;\nuniform mat4 g_WorldViewProjectionMatrix;\nvoid main() {}";
    const FRAGMENT: &str = "uniform vec4 m_Color;\nuniform sampler2D m_ColorMap;\nvoid main() {}";

    fn renderer_with(extensions: &[&str]) -> Renderer<HeadlessDriver> {
        logging::init_for_tests();
        let driver = HeadlessDriver::new().with_extensions(extensions);
        let mut renderer = Renderer::new(driver, RendererConfig::default());
        renderer.initialize().unwrap();
        renderer.driver_mut().clear_calls();
        renderer
    }

    fn unshaded(renderer: &mut Renderer<HeadlessDriver>) -> ProgramKey {
        let mut program = ShaderProgram::new("unshaded");
        program.add_source(ShaderStage::Vertex, "unshaded.vert", "GLSL100", VERTEX);
        program.add_source(ShaderStage::Fragment, "unshaded.frag", "GLSL100", FRAGMENT);
        renderer.create_program(program)
    }

    fn triangle_positions(renderer: &mut Renderer<HeadlessDriver>, usage: Usage, vertices: usize) -> BufferKey {
        renderer.create_buffer(VertexBuffer::new(
            BufferRole::Position,
            usage,
            3,
            BufferData::from_slice(&vec![0.0f32; vertices * 3]),
        ))
    }

    fn count(renderer: &Renderer<HeadlessDriver>, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        renderer.driver().count_calls(predicate)
    }

    #[test]
    fn test_initialize_applies_default_state() {
        logging::init_for_tests();
        let mut renderer = Renderer::new(HeadlessDriver::new(), RendererConfig::default());
        assert!(renderer.capabilities().is_none());
        renderer.initialize().unwrap();

        let calls = renderer.driver().calls();
        assert!(calls.contains(&DriverCall::Disable(gl::DITHER)));
        assert!(calls.contains(&DriverCall::Enable(gl::DEPTH_TEST)));
        assert!(calls.contains(&DriverCall::CullFace(gl::BACK)));
        assert!(renderer.context().depth_test);
        assert_eq!(renderer.context().texture_unit_count(), 8);
    }

    #[test]
    fn test_use_before_initialize_rejected() {
        let mut renderer = Renderer::new(HeadlessDriver::new(), RendererConfig::default());
        let program = unshaded(&mut renderer);
        assert!(matches!(renderer.set_shader(program), Err(RenderError::InvalidResourceState(_))));
    }

    #[test]
    fn test_identical_render_state_issues_no_calls() {
        let mut renderer = renderer_with(&[]);
        let state = RenderState::DEFAULT
            .with_blend_mode(BlendMode::Alpha)
            .with_cull_mode(FaceCullMode::Off)
            .with_polygon_offset(1.0, 2.0);

        renderer.apply_render_state(&state).unwrap();
        assert!(!renderer.driver().calls().is_empty());

        renderer.driver_mut().clear_calls();
        renderer.apply_render_state(&state).unwrap();
        assert!(renderer.driver().calls().is_empty());
    }

    #[test]
    fn test_viewport_clip_and_background_cached() {
        let mut renderer = renderer_with(&[]);
        renderer.set_viewport(0, 0, 640, 480);
        renderer.set_viewport(0, 0, 640, 480);
        renderer.set_clip_rect(10, 10, 100, 100);
        renderer.set_clip_rect(10, 10, 100, 100);
        renderer.set_background_color(ColorRgba::WHITE);
        renderer.set_background_color(ColorRgba::WHITE);
        renderer.set_depth_range(0.0, 0.5);
        renderer.set_depth_range(0.0, 0.5);
        renderer.set_alpha_to_coverage(true);
        renderer.set_alpha_to_coverage(true);

        assert_eq!(
            renderer.driver().calls(),
            &[
                DriverCall::Viewport(0, 0, 640, 480),
                DriverCall::Enable(gl::SCISSOR_TEST),
                DriverCall::Scissor(10, 10, 100, 100),
                DriverCall::ClearColor(1.0, 1.0, 1.0, 1.0),
                DriverCall::DepthRange(0.0, 0.5),
                DriverCall::Enable(gl::SAMPLE_ALPHA_TO_COVERAGE),
            ]
        );

        renderer.driver_mut().clear_calls();
        renderer.clear_clip_rect();
        renderer.clear_clip_rect();
        assert_eq!(renderer.driver().calls(), &[DriverCall::Disable(gl::SCISSOR_TEST)]);
    }

    #[test]
    fn test_clear_depth_restores_depth_writes() {
        let mut renderer = renderer_with(&[]);
        renderer.apply_render_state(&RenderState { depth_write: false, ..RenderState::DEFAULT }).unwrap();
        renderer.driver_mut().clear_calls();

        renderer.clear_buffers(true, true, false);
        assert_eq!(
            renderer.driver().calls(),
            &[
                DriverCall::DepthMask(true),
                DriverCall::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT),
            ]
        );

        renderer.driver_mut().clear_calls();
        renderer.clear_buffers(false, false, false);
        assert!(renderer.driver().calls().is_empty());
    }

    #[test]
    fn test_npot_texture_needs_capability() {
        let mut renderer = renderer_with(&[]);
        let image = renderer.create_image(Image::new(PixelFormat::RGBA8, 3, 5, vec![0; 60]));
        let result = renderer.set_texture(0, &Texture::new(image));
        assert!(matches!(result, Err(RenderError::UnsupportedFormat(_))));

        let mut renderer = renderer_with(&["GL_OES_texture_npot"]);
        let image = renderer.create_image(Image::new(PixelFormat::RGBA8, 3, 5, vec![0; 60]));
        renderer.set_texture(0, &Texture::new(image)).unwrap();
        assert_eq!(renderer.statistics().textures, 1);
    }

    #[test]
    fn test_cube_map_needs_six_faces() {
        let mut renderer = renderer_with(&[]);
        let faces = vec![vec![0u8; 64]; 5];
        let image = renderer.create_image(Image::cube_map(PixelFormat::RGBA8, 4, faces));
        let result = renderer.set_texture(0, &Texture::cube_map(image));
        assert!(matches!(result, Err(RenderError::UnsupportedFormat(_))));

        let faces = vec![vec![0u8; 64]; 6];
        let image = renderer.create_image(Image::cube_map(PixelFormat::RGBA8, 4, faces));
        renderer.driver_mut().clear_calls();
        renderer.set_texture(0, &Texture::cube_map(image)).unwrap();

        for face in 0..6 {
            let target = gl::TEXTURE_CUBE_MAP_POSITIVE_X + face;
            assert_eq!(
                count(&renderer, |c| matches!(c, DriverCall::TexImage2D { target: t, .. } if *t == target)),
                1
            );
        }
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::GenerateMipmap(gl::TEXTURE_CUBE_MAP))), 1);
    }

    #[test]
    fn test_texture_rebind_cached_per_unit() {
        let mut renderer = renderer_with(&[]);
        let image = renderer.create_image(Image::new(PixelFormat::RGBA8, 2, 2, vec![0; 16]));
        let texture = Texture::new(image).with_filters(MinFilter::BilinearNoMipMaps, MagFilter::Bilinear);

        renderer.set_texture(1, &texture).unwrap();
        renderer.driver_mut().clear_calls();
        renderer.set_texture(1, &texture).unwrap();
        assert!(renderer.driver().calls().is_empty());

        assert!(matches!(renderer.set_texture(8, &texture), Err(RenderError::InvalidResourceState(_))));
    }

    #[test]
    fn test_absent_uniform_resolved_once() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);

        renderer.program_mut(program).unwrap().set_uniform("m_Missing", UniformValue::Float(1.0));
        renderer.set_shader(program).unwrap();
        renderer.program_mut(program).unwrap().set_uniform("m_Missing", UniformValue::Float(2.0));
        renderer.set_shader(program).unwrap();
        renderer.set_shader(program).unwrap();

        let queries = count(&renderer, |c| matches!(c, DriverCall::GetUniformLocation(_, n) if n == "m_Missing"));
        assert_eq!(queries, 1);
    }

    #[test]
    fn test_relink_requeries_uniforms() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        renderer
            .program_mut(program)
            .unwrap()
            .set_uniform("m_Color", UniformValue::Color(ColorRgba::WHITE));
        renderer.set_shader(program).unwrap();
        let queries = |r: &Renderer<HeadlessDriver>| {
            count(r, |c| matches!(c, DriverCall::GetUniformLocation(_, n) if n == "m_Color"))
        };
        assert_eq!(queries(&renderer), 1);

        renderer.program_mut(program).unwrap().set_source(ShaderStage::Fragment, FRAGMENT).unwrap();
        renderer.set_shader(program).unwrap();
        assert_eq!(queries(&renderer), 2);
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::LinkProgram(_))), 2);
    }

    #[test]
    fn test_shader_switch_counted_once() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        renderer.set_shader(program).unwrap();
        renderer.set_shader(program).unwrap();
        assert_eq!(renderer.statistics().shader_switches, 1);
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::UseProgram(Some(_)))), 1);
    }

    #[test]
    fn test_sampler_uniform_accepts_unit_index() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        let shader = renderer.program_mut(program).unwrap();
        shader.declare_uniform("m_ColorMap", VarType::Texture2D);
        shader.set_uniform("m_ColorMap", UniformValue::Int(0));
        renderer.set_shader(program).unwrap();
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::Uniform1i(_, 0))), 1);
    }

    #[test]
    fn test_render_without_shader_rejected() {
        let mut renderer = renderer_with(&[]);
        let positions = triangle_positions(&mut renderer, Usage::Static, 3);
        let mesh = Mesh::new(PrimitiveMode::Triangles).with_buffer(positions);
        assert!(matches!(renderer.render_mesh(&mesh, 0, 1), Err(RenderError::InvalidResourceState(_))));
    }

    #[test]
    fn test_hybrid_mesh_draws_each_range() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        let positions = triangle_positions(&mut renderer, Usage::Static, 36);
        let indices: Vec<u16> = (0..36).collect();
        let index_buffer = renderer.create_buffer(VertexBuffer::indices(Usage::Static, &indices));
        let mesh = Mesh::new(PrimitiveMode::Triangles)
            .with_buffer(positions)
            .with_buffer(index_buffer)
            .with_hybrid(HybridLayout::new(vec![6, 12, 18]).with_starts(Some(1), Some(2)));

        renderer.set_shader(program).unwrap();
        renderer.driver_mut().clear_calls();
        renderer.render_mesh(&mesh, 0, 1).unwrap();

        let draws: Vec<DriverCall> = renderer
            .driver()
            .calls()
            .iter()
            .filter(|c| matches!(c, DriverCall::DrawElements { .. }))
            .cloned()
            .collect();
        let e = 2;
        assert_eq!(
            draws,
            vec![
                DriverCall::DrawElements {
                    mode: gl::TRIANGLES,
                    count: 6,
                    ty: gl::UNSIGNED_SHORT,
                    offset: 0,
                    instances: 1
                },
                DriverCall::DrawElements {
                    mode: gl::TRIANGLE_STRIP,
                    count: 12,
                    ty: gl::UNSIGNED_SHORT,
                    offset: 6 * e,
                    instances: 1
                },
                DriverCall::DrawElements {
                    mode: gl::TRIANGLE_FAN,
                    count: 18,
                    ty: gl::UNSIGNED_SHORT,
                    offset: 18 * e,
                    instances: 1
                },
            ]
        );
        assert_eq!(renderer.statistics().draw_calls, 3);
    }

    #[test]
    fn test_dynamic_buffer_update_paths() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        let positions = triangle_positions(&mut renderer, Usage::Dynamic, 3);
        let mesh = Mesh::new(PrimitiveMode::Triangles).with_buffer(positions);
        renderer.set_shader(program).unwrap();
        renderer.render_mesh(&mesh, 0, 1).unwrap();

        renderer
            .buffer_mut(positions)
            .unwrap()
            .update_data(BufferData::from_slice(&[1.0f32; 9]));
        renderer.driver_mut().clear_calls();
        renderer.render_mesh(&mesh, 0, 1).unwrap();
        assert_eq!(
            count(&renderer, |c| matches!(c, DriverCall::BufferSubData { offset: 0, len: 36, .. })),
            1
        );
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::BufferData { .. })), 0);

        renderer
            .buffer_mut(positions)
            .unwrap()
            .update_data(BufferData::from_slice(&[1.0f32; 18]));
        renderer.driver_mut().clear_calls();
        renderer.render_mesh(&mesh, 0, 1).unwrap();
        assert_eq!(
            count(&renderer, |c| matches!(
                c,
                DriverCall::BufferData { len: 72, usage, .. } if *usage == gl::DYNAMIC_DRAW
            )),
            1
        );
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::BufferSubData { .. })), 0);
    }

    #[test]
    fn test_release_deletes_only_at_frame_boundary() {
        let mut renderer = renderer_with(&[]);
        let image = renderer.create_image(Image::new(PixelFormat::RGBA8, 2, 2, vec![0; 16]));
        renderer.set_texture(0, &Texture::new(image)).unwrap();
        let program = unshaded(&mut renderer);
        renderer.set_shader(program).unwrap();

        renderer.release_image(image).unwrap();
        renderer.release_program(program).unwrap();
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::DeleteTexture(_))), 0);
        assert!(renderer.image(image).is_ok());

        renderer.on_frame().unwrap();
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::DeleteTexture(_))), 1);
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::DeleteProgram(_))), 1);
        assert_eq!(renderer.driver().live_textures(), 0);
        assert_eq!(renderer.driver().live_programs(), 0);
        assert!(renderer.image(image).is_err());
        assert_eq!(renderer.context().bound_textures[0], None);
        assert_eq!(renderer.context().bound_program, None);
        assert_eq!(renderer.statistics().frames, 1);
    }

    #[test]
    fn test_on_frame_surfaces_driver_error() {
        let mut renderer = renderer_with(&[]);
        renderer.driver_mut().push_error(gl::INVALID_ENUM);
        match renderer.on_frame() {
            Err(RenderError::DriverError { code, name }) => {
                assert_eq!(code, gl::INVALID_ENUM);
                assert_eq!(name, "INVALID_ENUM");
            }
            other => panic!("expected driver error, got {other:?}"),
        }
        renderer.on_frame().unwrap();
    }

    #[test]
    fn test_read_frame_buffer() {
        let mut renderer = renderer_with(&[]);
        renderer.set_viewport(0, 0, 2, 2);
        renderer.set_background_color(ColorRgba::new(1.0, 0.0, 0.0, 1.0));
        renderer.clear_buffers(true, false, false);

        let mut pixels = vec![0u8; 16];
        renderer.read_frame_buffer(None, &mut pixels).unwrap();
        assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
        assert_eq!(&pixels[12..], &[255, 0, 0, 255]);

        let mut short = vec![0u8; 8];
        assert!(matches!(
            renderer.read_frame_buffer(None, &mut short),
            Err(RenderError::InvalidResourceState(_))
        ));

        let target = FrameBuffer::new(2, 2);
        assert!(matches!(
            renderer.read_frame_buffer(Some(&target), &mut pixels),
            Err(RenderError::UnsupportedOperation(_))
        ));

        let image = renderer.read_frame_buffer_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_off_screen_targets_unsupported() {
        let mut renderer = renderer_with(&[]);
        let target = FrameBuffer::new(128, 128);
        renderer.set_frame_buffer(None).unwrap();
        assert!(matches!(
            renderer.set_frame_buffer(Some(&target)),
            Err(RenderError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            renderer.copy_frame_buffer(Some(&target), None),
            Err(RenderError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_reset_objects_recreates_on_next_use() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        let positions = triangle_positions(&mut renderer, Usage::Static, 3);
        let mesh = Mesh::new(PrimitiveMode::Triangles).with_buffer(positions);
        renderer.set_shader(program).unwrap();
        renderer.render_mesh(&mesh, 0, 1).unwrap();
        renderer.driver_mut().clear_calls();

        renderer.reset_objects();
        assert!(renderer.driver().calls().is_empty());
        assert_eq!(renderer.statistics().buffers, 0);
        assert_eq!(renderer.buffer(positions).unwrap().handle(), None);

        renderer.set_shader(program).unwrap();
        renderer.render_mesh(&mesh, 0, 1).unwrap();
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::CreateProgram(_))), 1);
        assert_eq!(count(&renderer, |c| matches!(c, DriverCall::CreateBuffer(_))), 1);
    }

    #[test]
    fn test_cleanup_deletes_every_object() {
        let mut renderer = renderer_with(&[]);
        let program = unshaded(&mut renderer);
        let positions = triangle_positions(&mut renderer, Usage::Static, 3);
        let image = renderer.create_image(Image::new(PixelFormat::RGBA8, 2, 2, vec![0; 16]));
        renderer.set_texture(0, &Texture::new(image)).unwrap();
        renderer.set_shader(program).unwrap();
        renderer
            .render_mesh(&Mesh::new(PrimitiveMode::Triangles).with_buffer(positions), 0, 1)
            .unwrap();

        renderer.cleanup();
        let driver = renderer.driver();
        assert_eq!(driver.live_textures(), 0);
        assert_eq!(driver.live_buffers(), 0);
        assert_eq!(driver.live_programs(), 0);
        assert_eq!(driver.live_shaders(), 0);
        assert_eq!(renderer.statistics().textures, 0);
    }

    #[test]
    fn test_config_file_drives_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.toml");
        let path = path.to_str().unwrap();
        let config = RendererConfig { max_texture_units: 2, ..RendererConfig::default() };
        config.save_to_file(path).unwrap();

        let mut renderer = Renderer::from_config_file(HeadlessDriver::new(), path).unwrap();
        renderer.initialize().unwrap();
        assert_eq!(renderer.context().texture_unit_count(), 2);

        let missing = dir.path().join("renderer.yaml");
        let result = Renderer::from_config_file(HeadlessDriver::new(), missing.to_str().unwrap());
        assert!(matches!(result, Err(RenderError::Config(_))));
    }
}
