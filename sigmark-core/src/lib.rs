pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。渲染空间与 PDF 空间共用此类型，由调用方区分语义。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub const fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub const fn origin() -> Self {
            Self(DVec2::ZERO)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于偏移量（容器原点、半尺寸等）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 宽高尺寸。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Size2 {
        pub width: f64,
        pub height: f64,
    }

    impl Size2 {
        #[inline]
        pub const fn new(width: f64, height: f64) -> Self {
            Self { width, height }
        }

        #[inline]
        pub const fn zero() -> Self {
            Self::new(0.0, 0.0)
        }

        /// 宽高都是有限正数时视为已测量。
        #[inline]
        pub fn is_measured(&self) -> bool {
            self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
        }

        #[inline]
        pub fn half(&self) -> Vector2 {
            Vector2::new(self.width * 0.5, self.height * 0.5)
        }

        #[inline]
        pub fn scaled(&self, factor: f64) -> Self {
            Self::new(self.width * factor, self.height * factor)
        }
    }

    /// 轴对齐边界框，用于命中测试。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn from_origin_size(origin: Point2, size: Size2) -> Self {
            Self {
                min: origin,
                max: Point2::new(origin.x() + size.width, origin.y() + size.height),
            }
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        /// 边界包含在内。
        #[inline]
        pub fn contains(&self, point: Point2) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod mark {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Size2};

    /// 签名标记的标准渲染尺寸（像素）。
    pub const DEFAULT_MARK_SIZE: Size2 = Size2::new(160.0, 60.0);

    pub const MIN_SCALE: f64 = 0.5;
    pub const MAX_SCALE: f64 = 2.0;
    pub const DEFAULT_SCALE: f64 = 1.0;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct MarkId(u64);

    impl MarkId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    impl fmt::Display for MarkId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// 放置在某一页上的签名。`position` 与 `size` 均为渲染空间像素，左上角为原点。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SignatureMark {
        pub id: MarkId,
        pub image_data: String,
        pub position: Point2,
        pub size: Size2,
        pub page_number: u32,
    }

    impl SignatureMark {
        #[inline]
        pub fn bounds(&self) -> Bounds2D {
            Bounds2D::from_origin_size(self.position, self.size)
        }
    }

    /// 页面渲染上下文，由外部渲染器提供。`page_dimensions` 已包含缩放。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ViewportState {
        pub scale: f64,
        pub page_dimensions: Size2,
    }

    impl ViewportState {
        #[inline]
        pub fn new(scale: f64, page_dimensions: Size2) -> Self {
            Self {
                scale,
                page_dimensions,
            }
        }

        /// 由页面固有尺寸（PDF 点）与缩放倍数构造视口，缩放自动限制在合法范围内。
        pub fn for_page(intrinsic: Size2, scale: f64) -> Self {
            let scale = clamp_scale(scale);
            Self::new(scale, intrinsic.scaled(scale))
        }

        /// 页面尚未完成测量时返回 `false`。
        #[inline]
        pub fn is_measured(&self) -> bool {
            self.page_dimensions.is_measured() && self.scale.is_finite() && self.scale > 0.0
        }
    }

    impl Default for ViewportState {
        fn default() -> Self {
            Self::new(DEFAULT_SCALE, Size2::zero())
        }
    }

    #[inline]
    pub fn clamp_scale(value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            DEFAULT_SCALE
        }
    }
}

pub mod transform {
    use crate::geometry::{Point2, Size2, Vector2};

    /// 指针坐标转换到渲染空间：减去容器原点，再减去半个标记尺寸，使标记中心落在指针下。
    #[inline]
    pub fn pointer_to_render_space(
        pointer: Point2,
        container_origin: Point2,
        half_size: Vector2,
    ) -> Point2 {
        Point2::from_vec(pointer.as_vec2() - container_origin.as_vec2() - half_size.as_vec2())
    }

    /// 渲染空间（左上原点、Y 向下、含缩放）转换到 PDF 空间（左下原点、Y 向上、点单位）。
    ///
    /// 返回的是标记左下角在 PDF 页面中的位置。
    #[inline]
    pub fn render_to_pdf_space(
        render_pos: Point2,
        render_size: Size2,
        page_height_render: f64,
        scale: f64,
    ) -> Point2 {
        let x = render_pos.x() / scale;
        let y = (page_height_render - render_pos.y() - render_size.height) / scale;
        Point2::new(x, y)
    }

    /// `render_to_pdf_space` 的逆变换。
    #[inline]
    pub fn pdf_to_render_space(
        pdf_pos: Point2,
        render_size: Size2,
        page_height_render: f64,
        scale: f64,
    ) -> Point2 {
        let x = pdf_pos.x() * scale;
        let y = page_height_render - pdf_pos.y() * scale - render_size.height;
        Point2::new(x, y)
    }

    /// 将标记左上角限制在页面内，使整个包围盒不越界。
    /// 标记大于页面时上界收缩为 0。
    pub fn clamp_position(position: Point2, size: Size2, page: Size2) -> Point2 {
        let max_x = (page.width - size.width).max(0.0);
        let max_y = (page.height - size.height).max(0.0);
        Point2::new(position.x().clamp(0.0, max_x), position.y().clamp(0.0, max_y))
    }

    /// 标记在页面中居中时的左上角位置。
    #[inline]
    pub fn centered_position(size: Size2, page: Size2) -> Point2 {
        Point2::new(
            page.width / 2.0 - size.width / 2.0,
            page.height / 2.0 - size.height / 2.0,
        )
    }
}

pub mod request {
    use serde::{Deserialize, Serialize};

    /// 签名服务接收的单个保存请求，坐标为 PDF 空间。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SignRequest {
        pub document_id: String,
        pub signature_data: String,
        pub x: f64,
        pub y: f64,
        pub page_number: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::geometry::{Bounds2D, Point2, Size2, Vector2};
    use super::mark::{DEFAULT_MARK_SIZE, MAX_SCALE, MIN_SCALE, ViewportState, clamp_scale};
    use super::request::SignRequest;
    use super::transform::*;

    fn assert_close(a: Point2, b: Point2) {
        assert!((a.x() - b.x()).abs() < 1e-9, "x: {} != {}", a.x(), b.x());
        assert!((a.y() - b.y()).abs() < 1e-9, "y: {} != {}", a.y(), b.y());
    }

    #[test]
    fn pointer_offset_centers_mark_under_cursor() {
        let render = pointer_to_render_space(
            Point2::new(500.0, 300.0),
            Point2::new(50.0, 50.0),
            Vector2::new(80.0, 30.0),
        );
        assert_eq!(render, Point2::new(370.0, 220.0));
        assert_eq!(DEFAULT_MARK_SIZE.half(), Vector2::new(80.0, 30.0));
    }

    #[test]
    fn render_to_pdf_flips_y_and_divides_scale() {
        let pdf = render_to_pdf_space(Point2::new(50.0, 700.0), DEFAULT_MARK_SIZE, 800.0, 1.0);
        assert_close(pdf, Point2::new(50.0, 40.0));

        // 2x zoom: page 600x800pt rendered as 1200x1600
        let pdf = render_to_pdf_space(Point2::new(100.0, 1400.0), DEFAULT_MARK_SIZE, 1600.0, 2.0);
        assert_close(pdf, Point2::new(50.0, 70.0));
    }

    #[test]
    fn render_pdf_round_trip_across_scales() {
        let positions = [
            Point2::new(0.0, 0.0),
            Point2::new(220.0, 370.0),
            Point2::new(13.37, 642.5),
            Point2::new(1039.9, 1.25),
        ];
        let mut scale = MIN_SCALE;
        while scale <= MAX_SCALE + 1e-12 {
            let page_height = 792.0 * scale;
            for position in positions {
                let pdf = render_to_pdf_space(position, DEFAULT_MARK_SIZE, page_height, scale);
                let back = pdf_to_render_space(pdf, DEFAULT_MARK_SIZE, page_height, scale);
                assert_close(back, position);
            }
            scale += 0.1;
        }
    }

    #[test]
    fn clamp_keeps_mark_inside_page() {
        let page = Size2::new(600.0, 800.0);
        assert_eq!(
            clamp_position(Point2::new(-20.0, 900.0), DEFAULT_MARK_SIZE, page),
            Point2::new(0.0, 740.0)
        );
        assert_eq!(
            clamp_position(Point2::new(590.0, -1.0), DEFAULT_MARK_SIZE, page),
            Point2::new(440.0, 0.0)
        );
        let inside = Point2::new(50.0, 700.0);
        assert_eq!(clamp_position(inside, DEFAULT_MARK_SIZE, page), inside);
    }

    #[test]
    fn clamp_is_idempotent() {
        let page = Size2::new(300.0, 200.0);
        for position in [
            Point2::new(-5.0, -5.0),
            Point2::new(1000.0, 1000.0),
            Point2::new(42.0, 17.5),
        ] {
            let once = clamp_position(position, DEFAULT_MARK_SIZE, page);
            let twice = clamp_position(once, DEFAULT_MARK_SIZE, page);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn clamp_does_not_panic_when_mark_exceeds_page() {
        let page = Size2::new(100.0, 40.0);
        let clamped = clamp_position(Point2::new(30.0, 30.0), DEFAULT_MARK_SIZE, page);
        assert_eq!(clamped, Point2::new(0.0, 0.0));
    }

    #[test]
    fn centered_position_matches_canonical_layout() {
        assert_eq!(
            centered_position(DEFAULT_MARK_SIZE, Size2::new(800.0, 1000.0)),
            Point2::new(320.0, 470.0)
        );
        assert_eq!(
            centered_position(DEFAULT_MARK_SIZE, Size2::new(600.0, 800.0)),
            Point2::new(220.0, 370.0)
        );
    }

    #[test]
    fn viewport_for_page_applies_clamped_scale() {
        let viewport = ViewportState::for_page(Size2::new(612.0, 792.0), 1.5);
        assert_eq!(viewport.page_dimensions, Size2::new(918.0, 1188.0));
        assert!(viewport.is_measured());

        let viewport = ViewportState::for_page(Size2::new(100.0, 100.0), 5.0);
        assert!((viewport.scale - MAX_SCALE).abs() < f64::EPSILON);
        assert!((clamp_scale(0.1) - MIN_SCALE).abs() < f64::EPSILON);
        assert!((clamp_scale(f64::NAN) - 1.0).abs() < f64::EPSILON);

        assert!(!ViewportState::default().is_measured());
    }

    #[test]
    fn bounds_contains_edges() {
        let bounds = Bounds2D::from_origin_size(Point2::new(10.0, 10.0), Size2::new(20.0, 5.0));
        assert!(bounds.contains(Point2::new(10.0, 10.0)));
        assert!(bounds.contains(Point2::new(30.0, 15.0)));
        assert!(!bounds.contains(Point2::new(30.1, 15.0)));
        assert_eq!(bounds.center(), Point2::new(20.0, 12.5));
    }

    #[test]
    fn sign_request_uses_service_field_names() {
        let request = SignRequest {
            document_id: "42".to_string(),
            signature_data: "data:image/png;base64,AAAA".to_string(),
            x: 50.0,
            y: 40.0,
            page_number: 1,
        };
        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(json["documentId"], "42");
        assert_eq!(json["signatureData"], "data:image/png;base64,AAAA");
        assert_eq!(json["x"], 50.0);
        assert_eq!(json["y"], 40.0);
        assert_eq!(json["pageNumber"], 1);
    }
}
