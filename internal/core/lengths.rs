// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Geometry types used for cursor rectangles and handle anchor points.

/// This type is used as a tagging type for use with [`euclid`] geometry to
/// mark coordinates in the logical (scale-factor independent) window space.
pub struct LogicalPx;

pub type LogicalLength = euclid::Length<f32, LogicalPx>;
pub type LogicalPoint = euclid::Point2D<f32, LogicalPx>;
pub type LogicalSize = euclid::Size2D<f32, LogicalPx>;
pub type LogicalRect = euclid::Rect<f32, LogicalPx>;
pub type LogicalVector = euclid::Vector2D<f32, LogicalPx>;

/// Convenience constructor for a [`LogicalPoint`].
pub fn logical_point(x: f32, y: f32) -> LogicalPoint {
    euclid::point2(x, y)
}

/// Convenience constructor for a [`LogicalRect`] from its origin and size.
pub fn logical_rect(x: f32, y: f32, width: f32, height: f32) -> LogicalRect {
    euclid::rect(x, y, width, height)
}
